//! Typed state access over a storage transaction
//!
//! | Key | Value |
//! |-----|-------|
//! | `global` | [`GlobalState`] |
//! | `position/<owner>` | [`StakePosition`] |

use crate::position::StakePosition;
use crate::state::GlobalState;
use pyt_core::error::{PytError, Result};
use pyt_core::types::AccountId;
use pyt_storage::{KvStore, Transaction};

pub const GLOBAL_KEY: &[u8] = b"global";
pub const POSITION_PREFIX: &[u8] = b"position/";

/// One operation's view of engine state
pub struct Ledger<'a, S: KvStore + ?Sized> {
    tx: Transaction<'a, S>,
}

impl<'a, S: KvStore + ?Sized> Ledger<'a, S> {
    pub fn begin(store: &'a S) -> Self {
        Self {
            tx: Transaction::begin(store),
        }
    }

    pub fn try_global(&self) -> Result<Option<GlobalState>> {
        self.tx.get_typed(GLOBAL_KEY)
    }

    /// Global state, failing with `NotInitialized` before `initialize`
    pub fn global(&self) -> Result<GlobalState> {
        self.try_global()?.ok_or(PytError::NotInitialized)
    }

    pub fn put_global(&mut self, state: &GlobalState) -> Result<()> {
        self.tx.put_typed(GLOBAL_KEY.to_vec(), state)
    }

    pub fn position(&self, owner: &AccountId) -> Result<Option<StakePosition>> {
        self.tx.get_typed(&owner.storage_key(POSITION_PREFIX))
    }

    /// Stage `position`, removing it instead once it is empty
    ///
    /// See [`StakePosition::is_empty`] for what survives a full withdrawal.
    pub fn put_position(&mut self, position: &StakePosition) -> Result<()> {
        let key = position.owner.storage_key(POSITION_PREFIX);
        if position.is_empty() {
            self.tx.delete(key);
            return Ok(());
        }
        self.tx.put_typed(key, position)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()
    }
}
