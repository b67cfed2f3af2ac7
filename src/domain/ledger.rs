use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::account::Account;
use crate::domain::payment::{Favorite, Payment};
use crate::domain::types::{
    AccountId, FavoriteId, Money, PaymentCategory, PaymentId, PaymentStatus, Phone,
};
use crate::error::{LedgerError, Result};

/// How `pay` decides whether an account can afford a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceCheck {
    /// Any strictly positive balance is enough, whatever the amount.
    /// The balance can end up negative.
    #[default]
    Positive,
    /// The balance must cover the full amount.
    Covering,
}

/// Plain collections handed between the ledger and the dump files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub payments: Vec<Payment>,
    pub favorites: Vec<Favorite>,
}

/// Owns every account, payment and favorite. Callers get copies back;
/// mutation only happens inside an operation.
///
/// Payments sit behind an `Arc` so a streaming sum can keep reading them
/// after the call returns. A write while such a sum is in flight copies the
/// payment list first; the sum keeps seeing the payments as they were.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: BTreeMap<AccountId, Account>,
    phones: HashMap<Phone, AccountId>,
    /// Creation order is kept so aggregation can split into contiguous chunks.
    payments: Arc<Vec<Payment>>,
    payment_index: HashMap<PaymentId, usize>,
    favorites: Vec<Favorite>,
    favorite_index: HashMap<FavoriteId, usize>,
    last_account_id: i64,
    balance_check: BalanceCheck,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_balance_check(BalanceCheck::default())
    }

    pub fn with_balance_check(balance_check: BalanceCheck) -> Self {
        Ledger {
            accounts: BTreeMap::new(),
            phones: HashMap::new(),
            payments: Arc::new(Vec::new()),
            payment_index: HashMap::new(),
            favorites: Vec::new(),
            favorite_index: HashMap::new(),
            last_account_id: 0,
            balance_check,
        }
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub(crate) fn shared_payments(&self) -> Arc<Vec<Payment>> {
        Arc::clone(&self.payments)
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn register_account(&mut self, phone: Phone) -> Result<Account> {
        if self.phones.contains_key(&phone) {
            return Err(LedgerError::PhoneAlreadyRegistered(phone.0));
        }

        self.last_account_id += 1;
        let account = Account::new(AccountId(self.last_account_id), phone);
        self.phones.insert(account.phone.clone(), account.id);
        self.accounts.insert(account.id, account.clone());

        tracing::debug!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    pub fn find_account_by_id(&self, account_id: AccountId) -> Result<Account> {
        self.accounts
            .get(&account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Deposits are not recorded as payments.
    pub fn deposit(&mut self, account_id: AccountId, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::AmountMustBePositive);
        }

        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        account.deposit(amount)
    }

    pub fn pay(
        &mut self,
        account_id: AccountId,
        amount: Money,
        category: PaymentCategory,
    ) -> Result<Payment> {
        if !amount.is_positive() {
            return Err(LedgerError::AmountMustBePositive);
        }

        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let affordable = match self.balance_check {
            BalanceCheck::Positive => account.balance.is_positive(),
            BalanceCheck::Covering => account.covers(amount),
        };
        if !affordable {
            return Err(LedgerError::NotEnoughBalance(account_id));
        }

        account.debit(amount)?;
        let payment = Payment::new(account_id, amount, category);
        self.payment_index
            .insert(payment.id.clone(), self.payments.len());
        Arc::make_mut(&mut self.payments).push(payment.clone());

        tracing::debug!(
            payment_id = %payment.id,
            account_id = %account_id,
            amount = %amount,
            "Payment created"
        );
        Ok(payment)
    }

    pub fn find_payment_by_id(&self, payment_id: &PaymentId) -> Result<Payment> {
        self.payment(payment_id).cloned()
    }

    /// Marks the payment as failed and refunds its amount. A payment that has
    /// already failed is refused so the account is never credited twice.
    pub fn reject(&mut self, payment_id: &PaymentId) -> Result<()> {
        let idx = self.payment_position(payment_id)?;
        let payment = &self.payments[idx];
        if payment.is_failed() {
            return Err(LedgerError::PaymentAlreadyFailed(payment_id.clone()));
        }

        let (account_id, amount) = (payment.account_id, payment.amount);
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        account.refund(amount)?;
        Arc::make_mut(&mut self.payments)[idx].status = PaymentStatus::Fail;

        tracing::debug!(payment_id = %payment_id, account_id = %account_id, "Payment rejected");
        Ok(())
    }

    pub fn repeat(&mut self, payment_id: &PaymentId) -> Result<Payment> {
        let source = self.payment(payment_id)?;
        let (account_id, amount, category) =
            (source.account_id, source.amount, source.category.clone());
        self.pay(account_id, amount, category)
    }

    pub fn favorite_payment(
        &mut self,
        payment_id: &PaymentId,
        name: impl Into<String>,
    ) -> Result<Favorite> {
        let favorite = Favorite::from_payment(self.payment(payment_id)?, name);
        self.favorite_index
            .insert(favorite.id.clone(), self.favorites.len());
        self.favorites.push(favorite.clone());
        Ok(favorite)
    }

    pub fn find_favorite_by_id(&self, favorite_id: &FavoriteId) -> Result<Favorite> {
        self.favorite_index
            .get(favorite_id)
            .map(|&idx| self.favorites[idx].clone())
            .ok_or_else(|| LedgerError::FavoriteNotFound(favorite_id.clone()))
    }

    pub fn pay_from_favorite(&mut self, favorite_id: &FavoriteId) -> Result<Payment> {
        let favorite = self.find_favorite_by_id(favorite_id)?;
        self.pay(favorite.account_id, favorite.amount, favorite.category)
    }

    /// Payments of one account in creation order. An account without any
    /// payment is reported as not found.
    pub fn account_history(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        let history: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();

        if history.is_empty() {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        Ok(history)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.values().cloned().collect(),
            payments: self.payments.to_vec(),
            favorites: self.favorites.clone(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot, balance_check: BalanceCheck) -> Result<Self> {
        let mut ledger = Self::with_balance_check(balance_check);
        ledger.restore(snapshot)?;
        Ok(ledger)
    }

    /// Adds previously exported records. The whole snapshot is validated
    /// before anything is stored: accounts must not clash by ID or phone, and
    /// every payment and favorite needs a positive amount and an account that
    /// exists in the ledger or in the snapshot. Payments and favorites with a
    /// known ID replace the stored record.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        self.check_restorable(&snapshot)?;

        for account in snapshot.accounts {
            self.last_account_id = self.last_account_id.max(account.id.0);
            self.phones.insert(account.phone.clone(), account.id);
            self.accounts.insert(account.id, account);
        }

        let payments = Arc::make_mut(&mut self.payments);
        for payment in snapshot.payments {
            match self.payment_index.get(&payment.id).copied() {
                Some(idx) => payments[idx] = payment,
                None => {
                    self.payment_index.insert(payment.id.clone(), payments.len());
                    payments.push(payment);
                }
            }
        }

        for favorite in snapshot.favorites {
            match self.favorite_index.get(&favorite.id).copied() {
                Some(idx) => self.favorites[idx] = favorite,
                None => {
                    self.favorite_index
                        .insert(favorite.id.clone(), self.favorites.len());
                    self.favorites.push(favorite);
                }
            }
        }

        tracing::debug!(
            "Restored ledger: {} accounts, {} payments, {} favorites",
            self.accounts.len(),
            self.payments.len(),
            self.favorites.len()
        );
        Ok(())
    }

    fn check_restorable(&self, snapshot: &Snapshot) -> Result<()> {
        let mut ids = HashSet::new();
        let mut phones = HashSet::new();
        for account in &snapshot.accounts {
            if self.accounts.contains_key(&account.id) || !ids.insert(account.id) {
                return Err(LedgerError::DuplicateAccount(account.id));
            }
            if self.phones.contains_key(&account.phone) || !phones.insert(&account.phone) {
                return Err(LedgerError::PhoneAlreadyRegistered(account.phone.0.clone()));
            }
        }

        let records = snapshot
            .payments
            .iter()
            .map(|p| (p.account_id, p.amount))
            .chain(snapshot.favorites.iter().map(|f| (f.account_id, f.amount)));
        for (account_id, amount) in records {
            if !self.accounts.contains_key(&account_id) && !ids.contains(&account_id) {
                return Err(LedgerError::AccountNotFound(account_id));
            }
            if !amount.is_positive() {
                return Err(LedgerError::AmountMustBePositive);
            }
        }
        Ok(())
    }

    fn payment_position(&self, payment_id: &PaymentId) -> Result<usize> {
        self.payment_index
            .get(payment_id)
            .copied()
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.clone()))
    }

    fn payment(&self, payment_id: &PaymentId) -> Result<&Payment> {
        self.payment_position(payment_id)
            .map(|idx| &self.payments[idx])
    }
}
