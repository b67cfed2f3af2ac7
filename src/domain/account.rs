use serde::{Deserialize, Serialize};

use crate::domain::types::{AccountId, Money, Phone};
use crate::error::{LedgerError, Result};

/// Field order matches the `id;phone;balance` dump layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub phone: Phone,
    pub balance: Money,
}

impl Account {
    pub fn new(id: AccountId, phone: Phone) -> Self {
        Account {
            id,
            phone,
            balance: Money::ZERO,
        }
    }

    pub fn deposit(&mut self, amount: Money) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        Ok(())
    }

    /// Balance may go negative: the positive-balance policy lets a payment
    /// exceed what is available.
    pub fn debit(&mut self, amount: Money) -> Result<()> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        Ok(())
    }

    pub fn refund(&mut self, amount: Money) -> Result<()> {
        self.deposit(amount)
    }

    pub fn covers(&self, amount: Money) -> bool {
        self.balance >= amount
    }
}
