pub mod account;
pub mod aggregate;
pub mod ledger;
pub mod payment;
pub mod types;

pub use account::Account;
pub use aggregate::{Progress, ProgressStream, PROGRESS_CHUNK_SIZE};
pub use ledger::{BalanceCheck, Ledger, Snapshot};
pub use payment::{Favorite, Payment};
pub use types::{AccountId, FavoriteId, Money, PaymentCategory, PaymentId, PaymentStatus, Phone};
