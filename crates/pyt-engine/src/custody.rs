//! # Token Custody
//!
//! The engine never holds tokens itself. Each operation emits at most one
//! [`Transfer`] which a [`Custody`] backend executes between a participant
//! and the protocol vault. Penalties, fees and compounding are accounting
//! moves inside the vault and need no transfer.

use parking_lot::Mutex;
use pyt_core::error::{PytError, Result};
use pyt_core::math::SafeMath;
use pyt_core::types::{AccountId, Amount};
use std::collections::HashMap;
use std::sync::Arc;

/// Token movement between a participant and the vault
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Participant pays into the vault
    In { from: AccountId, amount: Amount },
    /// Vault pays a participant
    Out { to: AccountId, amount: Amount },
}

impl Transfer {
    /// Transfer that undoes this one
    pub fn reversed(&self) -> Transfer {
        match *self {
            Transfer::In { from, amount } => Transfer::Out { to: from, amount },
            Transfer::Out { to, amount } => Transfer::In { from: to, amount },
        }
    }
}

/// External token movement service
pub trait Custody: Send + Sync {
    /// Move `amount` from `from` into the vault
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()>;

    /// Move `amount` from the vault to `to`
    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()>;

    fn execute(&self, transfer: &Transfer) -> Result<()> {
        match transfer {
            Transfer::In { from, amount } => self.transfer_in(from, *amount),
            Transfer::Out { to, amount } => self.transfer_out(to, *amount),
        }
    }
}

impl<T: Custody + ?Sized> Custody for Arc<T> {
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()> {
        (**self).transfer_in(from, amount)
    }

    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()> {
        (**self).transfer_out(to, amount)
    }
}

#[derive(Default)]
struct Book {
    balances: HashMap<AccountId, Amount>,
    vault: Amount,
    failures_pending: u32,
}

/// In-process token ledger for simulations and tests
#[derive(Default)]
pub struct InMemoryCustody {
    book: Mutex<Book>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` with fresh tokens
    pub fn mint(&self, account: &AccountId, amount: Amount) {
        let mut book = self.book.lock();
        let balance = book.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.book.lock().balances.get(account).copied().unwrap_or(0)
    }

    pub fn vault_balance(&self) -> Amount {
        self.book.lock().vault
    }

    /// Make the next `count` transfers fail
    pub fn fail_next(&self, count: u32) {
        self.book.lock().failures_pending = count;
    }

    fn take_failure(book: &mut Book) -> bool {
        if book.failures_pending > 0 {
            book.failures_pending -= 1;
            return true;
        }
        false
    }
}

impl Custody for InMemoryCustody {
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()> {
        let mut book = self.book.lock();
        if Self::take_failure(&mut book) {
            return Err(PytError::CustodyTransferFailed("injected failure".into()));
        }

        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(PytError::CustodyTransferFailed(format!(
                "{} holds {}, needs {}",
                from, available, amount
            )));
        }
        let vault = book.vault.safe_add(amount)?;
        book.balances.insert(*from, available - amount);
        book.vault = vault;
        Ok(())
    }

    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()> {
        let mut book = self.book.lock();
        if Self::take_failure(&mut book) {
            return Err(PytError::CustodyTransferFailed("injected failure".into()));
        }

        if book.vault < amount {
            return Err(PytError::CustodyTransferFailed(format!(
                "vault holds {}, needs {}",
                book.vault, amount
            )));
        }
        let balance = book.balances.get(to).copied().unwrap_or(0).safe_add(amount)?;
        book.vault -= amount;
        book.balances.insert(*to, balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new([1u8; 32])
    }

    #[test]
    fn test_transfer_roundtrip() {
        let custody = InMemoryCustody::new();
        custody.mint(&alice(), 100);

        custody.transfer_in(&alice(), 60).unwrap();
        assert_eq!(custody.balance_of(&alice()), 40);
        assert_eq!(custody.vault_balance(), 60);

        custody.transfer_out(&alice(), 10).unwrap();
        assert_eq!(custody.balance_of(&alice()), 50);
        assert_eq!(custody.vault_balance(), 50);
    }

    #[test]
    fn test_insufficient_balance() {
        let custody = InMemoryCustody::new();
        custody.mint(&alice(), 5);

        assert!(matches!(
            custody.transfer_in(&alice(), 6),
            Err(PytError::CustodyTransferFailed(_))
        ));
        assert!(matches!(
            custody.transfer_out(&alice(), 1),
            Err(PytError::CustodyTransferFailed(_))
        ));
        assert_eq!(custody.balance_of(&alice()), 5);
    }

    #[test]
    fn test_injected_failure() {
        let custody = InMemoryCustody::new();
        custody.mint(&alice(), 100);
        custody.fail_next(1);

        assert!(custody.transfer_in(&alice(), 10).is_err());
        assert!(custody.transfer_in(&alice(), 10).is_ok());
        assert_eq!(custody.vault_balance(), 10);
    }

    #[test]
    fn test_reversed_transfer() {
        let t = Transfer::In {
            from: alice(),
            amount: 7,
        };
        assert_eq!(
            t.reversed(),
            Transfer::Out {
                to: alice(),
                amount: 7
            }
        );
        assert_eq!(t.reversed().reversed(), t);
    }
}
