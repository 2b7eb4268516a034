//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use pyt_core::clock::{ManualClock, TimeSource};
use pyt_core::types::{AccountId, Amount, AssetId};
use pyt_crypto::checkpoint::CheckpointLog;
use pyt_crypto::proof::{ClaimProof, ClaimSigner};
use pyt_engine::{EngineConfig, GovernanceParams, InMemoryCustody, ProtocolEngine};
use pyt_storage::MemoryStore;
use std::sync::Arc;

pub const DAY: u64 = 86_400;
pub const GENESIS_TIME: i64 = 1_700_000_000;

pub type Engine =
    ProtocolEngine<MemoryStore, Arc<InMemoryCustody>, Arc<ManualClock>, Arc<CheckpointLog>>;

pub struct Harness {
    pub engine: Engine,
    pub custody: Arc<InMemoryCustody>,
    pub clock: Arc<ManualClock>,
    pub log: Arc<CheckpointLog>,
    pub governance: AccountId,
    pub asset: AssetId,
    entropy: u64,
}

/// Parameters used across scenarios: 7 day cooldown, 5% penalty, 1% fee
pub fn scenario_params() -> GovernanceParams {
    GovernanceParams {
        cooldown_period: 7 * DAY,
        early_withdrawal_penalty_bps: 500,
        min_withdraw_interval: 60,
        min_claim_delay: 0,
        insurance_fee_bps: 100,
        utilization_multiplier: 100,
        lp_bonus_bps: 500,
    }
}

impl Harness {
    pub fn new(params: GovernanceParams) -> Self {
        Self::with_config(params, EngineConfig::default())
    }

    pub fn with_config(params: GovernanceParams, config: EngineConfig) -> Self {
        let custody = Arc::new(InMemoryCustody::new());
        let clock = Arc::new(ManualClock::new(GENESIS_TIME));
        let log = Arc::new(CheckpointLog::new(128));
        let engine = ProtocolEngine::new(
            MemoryStore::new(),
            custody.clone(),
            clock.clone(),
            log.clone(),
            &config,
        );

        let governance = ClaimSigner::from_seed([0xAA; 32]).account_id();
        let asset = AssetId::from_symbol("PYT");
        engine.initialize_with(governance, asset, params).unwrap();
        custody.mint(&governance, u64::MAX / 4);

        Self {
            engine,
            custody,
            clock,
            log,
            governance,
            asset,
            entropy: 0,
        }
    }

    /// A funded participant
    pub fn participant(&self, seed: u8, balance: Amount) -> ClaimSigner {
        let signer = ClaimSigner::from_seed([seed; 32]);
        self.custody.mint(&signer.account_id(), balance);
        signer
    }

    /// Produce a checkpoint now and sign a claim over it
    pub fn proof(&mut self, signer: &ClaimSigner) -> ClaimProof {
        self.entropy += 1;
        let checkpoint = self
            .log
            .append(&self.entropy.to_le_bytes(), self.clock.now());
        signer.sign_claim(&self.asset, &checkpoint)
    }

    /// Move past the scenario cooldown so staked principal may claim
    pub fn pass_cooldown(&self) {
        self.clock.advance(7 * DAY);
    }

    pub fn deposit(&self, amount: Amount) {
        self.engine.deposit_rewards(self.governance, amount).unwrap();
    }

    /// Vault holdings must always equal what the state owes
    pub fn assert_solvent(&self) {
        let state = self.engine.global_state().unwrap();
        assert_eq!(
            self.custody.vault_balance() as u128,
            state.vault_liabilities(),
            "vault out of sync with accounting"
        );
    }
}
