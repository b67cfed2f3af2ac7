//! Error types for the ledger and its dump files

use thiserror::Error;

use crate::domain::types::{AccountId, FavoriteId, PaymentId};

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures returned by ledger operations. None of them leaves a partial
/// mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("phone already registered: {0}")]
    PhoneAlreadyRegistered(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("amount must be greater than zero")]
    AmountMustBePositive,

    /// The result does not fit in i64 minor units.
    #[error("amount overflow")]
    AmountOverflow,

    #[error("not enough balance on account {0}")]
    NotEnoughBalance(AccountId),

    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The payment was already rejected; a second reject would credit twice.
    #[error("payment already failed: {0}")]
    PaymentAlreadyFailed(PaymentId),

    #[error("favorite not found: {0}")]
    FavoriteNotFound(FavoriteId),

    /// Restoring a snapshot hit an account ID that is already stored.
    #[error("duplicate account: {0}")]
    DuplicateAccount(AccountId),
}

/// Failures of the flat-file import/export layer
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{file} record {line}: {message}")]
    InvalidRecord {
        file: String,
        line: usize,
        message: String,
    },

    #[error("records per file must be greater than zero")]
    InvalidRecordsPerFile,

    #[error("restore failed: {0}")]
    Restore(#[from] LedgerError),
}
