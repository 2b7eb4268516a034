//! # Protocol Engine
//!
//! Runs every state-changing operation as one atomic unit:
//!
//! ```text
//! lock -> now -> load -> sync(now) -> validate -> mutate -> persist (staged)
//!      -> custody transfer -> commit
//! ```
//!
//! A failure before the transfer drops the staged writes. A failed
//! transfer does the same. If the commit fails after a transfer succeeded
//! the transfer is reversed.

use crate::accumulator::SyncOutcome;
use crate::config::{EngineConfig, LimitsConfig};
use crate::custody::{Custody, Transfer};
use crate::gate::MevProofGate;
use crate::insurance::{Drawdown, SkimSource};
use crate::ledger::Ledger;
use crate::params::{authorize, GovernanceParams, ParameterChange};
use crate::policy;
use crate::position::{PositionStatus, StakePosition};
use crate::state::{GlobalState, RewardQuote};
use parking_lot::Mutex;
use pyt_core::clock::TimeSource;
use pyt_core::error::{PytError, Result};
use pyt_core::math::{bps_of, SafeMath};
use pyt_core::types::{AccountId, Amount, AssetId, Timestamp};
use pyt_crypto::checkpoint::CheckpointSource;
use pyt_crypto::proof::ClaimProof;
use pyt_storage::KvStore;
use tracing::{debug, error, info, warn};

/// Result of a stake
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeReceipt {
    pub owner: AccountId,
    pub amount: Amount,
    pub principal: Amount,
    pub total_staked: Amount,
    pub timestamp: Timestamp,
}

/// Result of an unstake
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnstakeReceipt {
    pub owner: AccountId,
    pub amount: Amount,
    pub penalty: Amount,
    pub net_amount: Amount,
    pub principal: Amount,
    pub total_staked: Amount,
    pub timestamp: Timestamp,
}

/// Result of a claim or compound
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub owner: AccountId,
    /// Share of distributed income, before multipliers
    pub base_reward: Amount,
    /// Reward before the insurance fee, multipliers applied
    pub gross_reward: Amount,
    /// Part of the gross reward paid by the insurance fund
    pub boost_from_insurance: Amount,
    pub insurance_fee: Amount,
    pub net_reward: Amount,
    /// Net reward was restaked instead of paid out
    pub compounded: bool,
    pub principal: Amount,
    pub checkpoint_slot: u64,
    pub timestamp: Timestamp,
}

/// Result of a reward deposit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub depositor: AccountId,
    pub amount: Amount,
    pub outcome: SyncOutcome,
    pub acc_reward_per_share: u128,
}

/// Staking engine over a store, a custody backend, a clock and a
/// checkpoint source
pub struct ProtocolEngine<S, C, T, K> {
    store: S,
    custody: C,
    clock: T,
    gate: MevProofGate<K>,
    limits: LimitsConfig,
    genesis: GovernanceParams,
    /// Single writer; every operation holds it from load to commit
    write_lock: Mutex<()>,
}

impl<S, C, T, K> ProtocolEngine<S, C, T, K>
where
    S: KvStore,
    C: Custody,
    T: TimeSource,
    K: CheckpointSource,
{
    pub fn new(store: S, custody: C, clock: T, checkpoints: K, config: &EngineConfig) -> Self {
        Self {
            store,
            custody,
            clock,
            gate: MevProofGate::new(checkpoints, config.mev),
            limits: config.limits,
            genesis: config.genesis,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn checkpoints(&self) -> &K {
        self.gate.source()
    }

    // === Lifecycle ===

    /// Create the global state with the configured genesis parameters
    pub fn initialize(&self, governance: AccountId, asset_id: AssetId) -> Result<GlobalState> {
        self.initialize_with(governance, asset_id, self.genesis)
    }

    /// Create the global state with explicit parameters
    pub fn initialize_with(
        &self,
        governance: AccountId,
        asset_id: AssetId,
        params: GovernanceParams,
    ) -> Result<GlobalState> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);

        if ledger.try_global()?.is_some() {
            return Err(PytError::AlreadyInitialized);
        }
        params.validate()?;

        let state = GlobalState::new(governance, asset_id, params, now);
        ledger.put_global(&state)?;
        self.finish(ledger, None)?;

        info!(%governance, asset = %asset_id.to_hex(), "protocol initialized");
        Ok(state)
    }

    // === Staking ===

    /// Lock `amount` of principal for `owner`
    pub fn stake(&self, owner: AccountId, amount: Amount) -> Result<StakeReceipt> {
        if amount == 0 {
            return Err(PytError::invalid("amount", 0, "stake must be positive"));
        }

        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;

        let mut position = ledger
            .position(&owner)?
            .unwrap_or_else(|| StakePosition::new(owner, now));
        Self::stake_into(&mut state, &mut position, amount, now)?;

        ledger.put_position(&position)?;
        ledger.put_global(&state)?;
        self.finish(ledger, Some(Transfer::In { from: owner, amount }))?;

        info!(%owner, amount, principal = position.principal, "staked");
        Ok(StakeReceipt {
            owner,
            amount,
            principal: position.principal,
            total_staked: state.total_staked(),
            timestamp: now,
        })
    }

    /// Stake the sum of several amounts as one operation
    pub fn batch_stake(&self, owner: AccountId, amounts: &[Amount]) -> Result<StakeReceipt> {
        let total = self.batch_total(amounts)?;
        self.stake(owner, total)
    }

    /// Withdraw `amount` of principal, net of any early-withdrawal penalty
    pub fn unstake(&self, owner: AccountId, amount: Amount) -> Result<UnstakeReceipt> {
        if amount == 0 {
            return Err(PytError::invalid("amount", 0, "unstake must be positive"));
        }

        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;

        let mut position = ledger
            .position(&owner)?
            .ok_or(PytError::PositionNotFound(owner))?;
        if amount > position.principal {
            return Err(PytError::InsufficientStake {
                requested: amount,
                available: position.principal,
            });
        }
        policy::check_withdraw_interval(&position, now, state.params.min_withdraw_interval)?;
        let quote = policy::quote_withdrawal(&position, amount, now, &state.params)?;

        state.accumulator.accrue(&mut position)?;
        position.remove_principal(amount, now)?;
        state.accumulator.remove_stake(amount)?;
        if position.principal == 0 {
            state.staker_count = state.staker_count.saturating_sub(1);
        }
        state
            .insurance
            .skim(SkimSource::EarlyWithdrawalPenalty, quote.penalty)?;

        ledger.put_position(&position)?;
        ledger.put_global(&state)?;
        let transfer = (quote.net > 0).then_some(Transfer::Out {
            to: owner,
            amount: quote.net,
        });
        self.finish(ledger, transfer)?;

        if quote.penalty > 0 {
            info!(
                %owner,
                amount,
                penalty = quote.penalty,
                held_secs = quote.held,
                "early withdrawal penalized"
            );
        }
        info!(%owner, amount, net = quote.net, principal = position.principal, "unstaked");
        Ok(UnstakeReceipt {
            owner,
            amount,
            penalty: quote.penalty,
            net_amount: quote.net,
            principal: position.principal,
            total_staked: state.total_staked(),
            timestamp: now,
        })
    }

    /// Unstake the sum of several amounts as one operation
    pub fn batch_unstake(&self, owner: AccountId, amounts: &[Amount]) -> Result<UnstakeReceipt> {
        let total = self.batch_total(amounts)?;
        self.unstake(owner, total)
    }

    // === Rewards ===

    /// Add reward income and distribute it to current stakers
    pub fn deposit_rewards(&self, depositor: AccountId, amount: Amount) -> Result<DepositReceipt> {
        if amount == 0 {
            return Err(PytError::invalid("amount", 0, "deposit must be positive"));
        }

        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        let outcome = state.sync(now, amount)?;

        ledger.put_global(&state)?;
        self.finish(
            ledger,
            Some(Transfer::In {
                from: depositor,
                amount,
            }),
        )?;

        info!(%depositor, amount, ?outcome, "reward income deposited");
        Ok(DepositReceipt {
            depositor,
            amount,
            outcome,
            acc_reward_per_share: state.accumulator.acc_reward_per_share,
        })
    }

    /// Pay out pending reward; compounds instead if the position opted in
    pub fn claim(&self, owner: AccountId, proof: &ClaimProof) -> Result<ClaimReceipt> {
        self.claim_inner(owner, proof, false)
    }

    /// Restake pending reward regardless of the auto-compound flag
    pub fn compound(&self, owner: AccountId, proof: &ClaimProof) -> Result<ClaimReceipt> {
        self.claim_inner(owner, proof, true)
    }

    fn claim_inner(
        &self,
        owner: AccountId,
        proof: &ClaimProof,
        force_compound: bool,
    ) -> Result<ClaimReceipt> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;

        let checkpoint = self.gate.admit(proof, now)?;
        let mut position = ledger
            .position(&owner)?
            .ok_or(PytError::PositionNotFound(owner))?;
        self.gate.authorize(&state.asset_id, &owner, proof, position.last_claim_slot)?;
        policy::check_stake_period(&position, now, state.params.cooldown_period)?;
        policy::check_claim_delay(&position, now, state.params.min_claim_delay)?;

        let base = state.accumulator.settle(&mut position)?;
        let quote = state.quote_reward(base, &position, now)?;
        let gross = quote.gross();
        if gross == 0 {
            return Err(PytError::NoPendingReward(owner));
        }
        if quote.shortfall() > 0 {
            warn!(
                %owner,
                owed = quote.owed,
                shortfall = quote.shortfall(),
                insurance = state.insurance.balance,
                "insurance fund cannot cover the full boost"
            );
        }

        let fee = bps_of(gross, state.params.insurance_fee_bps)?;
        let net = gross.safe_sub(fee)?;
        state.fund_reward(&quote)?;
        state.insurance.skim(SkimSource::ClaimFee, fee)?;
        state.total_rewards_distributed = state.total_rewards_distributed.safe_add(net as u128)?;

        position.last_claim_timestamp = now;
        position.last_claim_slot = Some(checkpoint.slot);
        position.total_rewards_claimed = position.total_rewards_claimed.safe_add(net as u128)?;

        let compounded = force_compound || position.auto_compound;
        let transfer = if compounded {
            if net > 0 {
                Self::stake_into(&mut state, &mut position, net, now)?;
            }
            None
        } else {
            (net > 0).then_some(Transfer::Out { to: owner, amount: net })
        };

        ledger.put_position(&position)?;
        ledger.put_global(&state)?;
        self.finish(ledger, transfer)?;

        info!(
            %owner,
            base,
            gross,
            boost = quote.from_insurance,
            fee,
            net,
            compounded,
            slot = checkpoint.slot,
            "rewards claimed"
        );
        Ok(ClaimReceipt {
            owner,
            base_reward: base,
            gross_reward: gross,
            boost_from_insurance: quote.from_insurance,
            insurance_fee: fee,
            net_reward: net,
            compounded,
            principal: position.principal,
            checkpoint_slot: checkpoint.slot,
            timestamp: now,
        })
    }

    /// Opt a position in or out of auto-compounding
    pub fn set_auto_compound(&self, owner: AccountId, enabled: bool) -> Result<()> {
        self.update_position(owner, |_| Ok(()), |position| position.auto_compound = enabled)?;
        info!(%owner, enabled, "auto-compound updated");
        Ok(())
    }

    // === Governance ===

    /// Replace the governance parameters; returns the fields that changed
    pub fn set_governance_params(
        &self,
        caller: AccountId,
        params: GovernanceParams,
    ) -> Result<Vec<ParameterChange>> {
        self.update_params(caller, "update parameters", |_| params)
    }

    /// Change only the utilization multiplier
    pub fn update_utilization(
        &self,
        caller: AccountId,
        multiplier: u64,
    ) -> Result<Vec<ParameterChange>> {
        self.update_params(caller, "update utilization", |current| GovernanceParams {
            utilization_multiplier: multiplier,
            ..current
        })
    }

    /// Hand governance to another principal
    pub fn transfer_governance(&self, caller: AccountId, new_governance: AccountId) -> Result<()> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;
        authorize(&state.governance, &caller, "transfer governance")?;

        state.governance = new_governance;
        ledger.put_global(&state)?;
        self.finish(ledger, None)?;

        info!(from = %caller, to = %new_governance, "governance transferred");
        Ok(())
    }

    /// Flag or unflag `owner` as a liquidity provider
    pub fn set_liquidity_provider(
        &self,
        caller: AccountId,
        owner: AccountId,
        enabled: bool,
    ) -> Result<()> {
        self.update_position(
            owner,
            |state| authorize(&state.governance, &caller, "set liquidity provider"),
            |position| position.is_liquidity_provider = enabled,
        )?;
        info!(%owner, enabled, "liquidity provider flag updated");
        Ok(())
    }

    /// Pay `amount` out of the insurance fund to `recipient`
    pub fn draw_insurance(
        &self,
        caller: AccountId,
        recipient: AccountId,
        amount: Amount,
        reason: &str,
    ) -> Result<Drawdown> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;
        authorize(&state.governance, &caller, "draw insurance")?;

        let drawdown = state.insurance.draw(recipient, amount, reason, now)?;
        ledger.put_global(&state)?;
        self.finish(ledger, Some(Transfer::Out { to: recipient, amount }))?;
        Ok(drawdown)
    }

    // === Queries ===

    pub fn global_state(&self) -> Result<GlobalState> {
        Ledger::begin(&self.store).global()
    }

    pub fn position(&self, owner: &AccountId) -> Result<Option<StakePosition>> {
        Ledger::begin(&self.store).position(owner)
    }

    /// Reward a claim by `owner` would pay now, before the insurance fee
    pub fn pending_reward(&self, owner: &AccountId) -> Result<Amount> {
        Ok(self.reward_quote(owner)?.gross())
    }

    /// Unmultiplied share of distributed income held for `owner`
    pub fn base_reward(&self, owner: &AccountId) -> Result<Amount> {
        Ok(self.reward_quote(owner)?.base)
    }

    /// Full funding breakdown of a claim by `owner` at the current time
    pub fn reward_quote(&self, owner: &AccountId) -> Result<RewardQuote> {
        let ledger = Ledger::begin(&self.store);
        let state = ledger.global()?;
        match ledger.position(owner)? {
            Some(position) => {
                let base = state.accumulator.base_pending(&position)?;
                state.quote_reward(base, &position, self.clock.now())
            }
            None => Ok(RewardQuote::default()),
        }
    }

    pub fn position_status(&self, owner: &AccountId) -> Result<PositionStatus> {
        let ledger = Ledger::begin(&self.store);
        let state = ledger.global()?;
        Ok(match ledger.position(owner)? {
            Some(position) => position.status(self.clock.now(), &state.params),
            None => PositionStatus::Uninitialized,
        })
    }

    // === Internals ===

    /// Add principal after banking reward earned on the old principal
    fn stake_into(
        state: &mut GlobalState,
        position: &mut StakePosition,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        state.accumulator.accrue(position)?;
        if position.principal == 0 {
            state.staker_count = state.staker_count.safe_add(1)?;
        }
        position.add_principal(amount, now)?;
        state.accumulator.add_stake(amount)
    }

    fn batch_total(&self, amounts: &[Amount]) -> Result<Amount> {
        if amounts.is_empty() {
            return Err(PytError::invalid("batch_len", 0, "batch must not be empty"));
        }
        if amounts.len() > self.limits.max_batch_len {
            return Err(PytError::invalid(
                "batch_len",
                amounts.len() as u64,
                "batch exceeds configured limit",
            ));
        }
        amounts.iter().try_fold(0u64, |total, &amount| {
            if amount == 0 {
                return Err(PytError::invalid("amount", 0, "batch entries must be positive"));
            }
            total.safe_add(amount)
        })
    }

    fn update_params(
        &self,
        caller: AccountId,
        operation: &'static str,
        next: impl FnOnce(GovernanceParams) -> GovernanceParams,
    ) -> Result<Vec<ParameterChange>> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;
        authorize(&state.governance, &caller, operation)?;

        let params = next(state.params);
        params.validate()?;
        let changes = state.params.diff(&params);
        state.params = params;

        ledger.put_global(&state)?;
        self.finish(ledger, None)?;

        for change in &changes {
            info!(
                field = change.field,
                old = change.old,
                new = change.new,
                "governance parameter changed"
            );
        }
        Ok(changes)
    }

    fn update_position(
        &self,
        owner: AccountId,
        check: impl FnOnce(&GlobalState) -> Result<()>,
        apply: impl FnOnce(&mut StakePosition),
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut ledger = Ledger::begin(&self.store);
        let mut state = ledger.global()?;
        state.sync(now, 0)?;
        check(&state)?;

        let mut position = ledger
            .position(&owner)?
            .ok_or(PytError::PositionNotFound(owner))?;
        apply(&mut position);

        ledger.put_position(&position)?;
        ledger.put_global(&state)?;
        self.finish(ledger, None)
    }

    /// Execute the custody transfer, then commit the staged writes
    fn finish(&self, ledger: Ledger<'_, S>, transfer: Option<Transfer>) -> Result<()> {
        if let Some(transfer) = &transfer {
            if let Err(e) = self.custody.execute(transfer) {
                warn!(?transfer, error = %e, "custody transfer failed, rolling back");
                return Err(match e {
                    PytError::CustodyTransferFailed(_) => e,
                    other => PytError::CustodyTransferFailed(other.to_string()),
                });
            }
        }

        if let Err(e) = ledger.commit() {
            error!(error = %e, "commit failed after custody transfer");
            if let Some(transfer) = transfer {
                let reversal = transfer.reversed();
                match self.custody.execute(&reversal) {
                    Ok(()) => debug!(?reversal, "custody transfer reversed"),
                    Err(re) => error!(?reversal, error = %re, "custody reversal failed"),
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::InMemoryCustody;
    use pyt_core::clock::ManualClock;
    use pyt_crypto::checkpoint::CheckpointLog;
    use pyt_crypto::proof::ClaimSigner;
    use pyt_storage::MemoryStore;
    use std::sync::Arc;

    type TestEngine =
        ProtocolEngine<MemoryStore, Arc<InMemoryCustody>, Arc<ManualClock>, Arc<CheckpointLog>>;

    struct Harness {
        engine: TestEngine,
        custody: Arc<InMemoryCustody>,
        clock: Arc<ManualClock>,
        log: Arc<CheckpointLog>,
        gov: AccountId,
        asset: AssetId,
    }

    impl Harness {
        fn new(params: GovernanceParams) -> Self {
            let custody = Arc::new(InMemoryCustody::new());
            let clock = Arc::new(ManualClock::new(1_000));
            let log = Arc::new(CheckpointLog::new(64));
            let engine = ProtocolEngine::new(
                MemoryStore::new(),
                custody.clone(),
                clock.clone(),
                log.clone(),
                &EngineConfig::default(),
            );
            let gov = AccountId::new([0xAA; 32]);
            let asset = AssetId::from_symbol("PYT");
            engine.initialize_with(gov, asset, params).unwrap();
            custody.mint(&gov, 1_000_000);
            Self {
                engine,
                custody,
                clock,
                log,
                gov,
                asset,
            }
        }

        fn proof(&self, signer: &ClaimSigner) -> ClaimProof {
            let checkpoint = self.log.append(b"slot", self.clock.now());
            signer.sign_claim(&self.asset, &checkpoint)
        }
    }

    fn params() -> GovernanceParams {
        GovernanceParams {
            cooldown_period: 7 * 86_400,
            early_withdrawal_penalty_bps: 500,
            min_withdraw_interval: 60,
            min_claim_delay: 0,
            insurance_fee_bps: 100,
            utilization_multiplier: 100,
            lp_bonus_bps: 500,
        }
    }

    #[test]
    fn test_initialize_twice() {
        let h = Harness::new(params());
        assert_eq!(
            h.engine.initialize(h.gov, h.asset),
            Err(PytError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_operations_before_initialize() {
        let engine = ProtocolEngine::new(
            MemoryStore::new(),
            InMemoryCustody::new(),
            ManualClock::new(0),
            CheckpointLog::new(4),
            &EngineConfig::default(),
        );
        assert_eq!(
            engine.stake(AccountId::new([1u8; 32]), 1),
            Err(PytError::NotInitialized)
        );
    }

    #[test]
    fn test_stake_and_claim() {
        let h = Harness::new(params());
        let alice = ClaimSigner::from_seed([1u8; 32]);
        h.custody.mint(&alice.account_id(), 1_000);

        let receipt = h.engine.stake(alice.account_id(), 1_000).unwrap();
        assert_eq!(receipt.total_staked, 1_000);
        assert_eq!(h.custody.balance_of(&alice.account_id()), 0);

        h.clock.advance(8 * 86_400);
        h.engine.deposit_rewards(h.gov, 100).unwrap();
        assert_eq!(h.engine.pending_reward(&alice.account_id()).unwrap(), 100);

        let claim = h.engine.claim(alice.account_id(), &h.proof(&alice)).unwrap();
        assert_eq!(claim.gross_reward, 100);
        assert_eq!(claim.insurance_fee, 1);
        assert_eq!(claim.net_reward, 99);
        assert_eq!(h.custody.balance_of(&alice.account_id()), 99);
        assert_eq!(h.engine.global_state().unwrap().insurance.balance, 1);
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let h = Harness::new(params());
        let alice = AccountId::new([1u8; 32]);
        assert!(matches!(
            h.engine.stake(alice, 0),
            Err(PytError::InvalidParameter { field: "amount", .. })
        ));
        assert!(matches!(
            h.engine.unstake(alice, 0),
            Err(PytError::InvalidParameter { field: "amount", .. })
        ));
    }

    #[test]
    fn test_claim_without_reward() {
        let h = Harness::new(params());
        let alice = ClaimSigner::from_seed([1u8; 32]);
        h.custody.mint(&alice.account_id(), 10);
        h.engine.stake(alice.account_id(), 10).unwrap();
        h.clock.advance(7 * 86_400);

        assert_eq!(
            h.engine.claim(alice.account_id(), &h.proof(&alice)),
            Err(PytError::NoPendingReward(alice.account_id()))
        );
    }

    #[test]
    fn test_unstake_more_than_principal() {
        let h = Harness::new(params());
        let alice = AccountId::new([1u8; 32]);
        h.custody.mint(&alice, 100);
        h.engine.stake(alice, 100).unwrap();
        h.clock.advance(60);

        assert_eq!(
            h.engine.unstake(alice, 101),
            Err(PytError::InsufficientStake {
                requested: 101,
                available: 100
            })
        );
    }

    #[test]
    fn test_failed_stake_transfer_rolls_back() {
        let h = Harness::new(params());
        let alice = AccountId::new([1u8; 32]);
        h.custody.mint(&alice, 100);
        h.custody.fail_next(1);

        assert!(matches!(
            h.engine.stake(alice, 100),
            Err(PytError::CustodyTransferFailed(_))
        ));
        assert!(h.engine.position(&alice).unwrap().is_none());
        assert_eq!(h.engine.global_state().unwrap().total_staked(), 0);
        assert_eq!(h.custody.balance_of(&alice), 100);
    }

    #[test]
    fn test_governance_only() {
        let h = Harness::new(params());
        let mallory = AccountId::new([0x66; 32]);

        assert!(matches!(
            h.engine.update_utilization(mallory, 50),
            Err(PytError::Unauthorized { .. })
        ));
        assert!(matches!(
            h.engine.transfer_governance(mallory, mallory),
            Err(PytError::Unauthorized { .. })
        ));

        let changes = h.engine.update_utilization(h.gov, 50).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(h.engine.global_state().unwrap().params.utilization_multiplier, 50);
    }

    #[test]
    fn test_invalid_params_leave_state_unchanged() {
        let h = Harness::new(params());
        let bad = GovernanceParams {
            early_withdrawal_penalty_bps: 10_001,
            ..params()
        };

        assert!(h.engine.set_governance_params(h.gov, bad).is_err());
        assert_eq!(h.engine.global_state().unwrap().params, params());
    }

    #[test]
    fn test_batch_limits() {
        let h = Harness::new(params());
        let alice = AccountId::new([1u8; 32]);
        h.custody.mint(&alice, 1_000);

        assert!(h.engine.batch_stake(alice, &[]).is_err());
        assert!(h.engine.batch_stake(alice, &[1; 17]).is_err());
        assert!(h.engine.batch_stake(alice, &[5, 0]).is_err());

        let receipt = h.engine.batch_stake(alice, &[100, 200, 300]).unwrap();
        assert_eq!(receipt.principal, 600);
    }

    /// Store whose commits can be made to fail
    struct FlakyStore {
        inner: MemoryStore,
        fail_commits: std::sync::atomic::AtomicBool,
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn apply_batch(&self, batch: pyt_storage::WriteBatch) -> Result<()> {
            if self.fail_commits.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(PytError::Storage("disk full".into()));
            }
            self.inner.apply_batch(batch)
        }
    }

    #[test]
    fn test_commit_failure_reverses_transfer() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_commits: std::sync::atomic::AtomicBool::new(false),
        });
        let custody = Arc::new(InMemoryCustody::new());
        let engine = ProtocolEngine::new(
            store.clone(),
            custody.clone(),
            ManualClock::new(0),
            CheckpointLog::new(4),
            &EngineConfig::default(),
        );
        let alice = AccountId::new([1u8; 32]);
        engine
            .initialize_with(alice, AssetId::from_symbol("PYT"), params())
            .unwrap();
        custody.mint(&alice, 100);

        store
            .fail_commits
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(matches!(engine.stake(alice, 60), Err(PytError::Storage(_))));

        assert_eq!(custody.balance_of(&alice), 100);
        assert_eq!(custody.vault_balance(), 0);
        assert!(engine.position(&alice).unwrap().is_none());
    }
}
