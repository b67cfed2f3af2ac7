//! In-memory wallet ledger: accounts, payments against them, favorite payment
//! templates, and parallel sums over the payment set.

pub mod config;
pub mod domain;
pub mod error;
pub mod parser;
pub mod writer;

pub use config::Config;
pub use domain::{Ledger, Money};
pub use error::{DumpError, LedgerError};
