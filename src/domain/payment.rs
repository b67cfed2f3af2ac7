use serde::{Deserialize, Serialize};

use crate::domain::types::{AccountId, FavoriteId, Money, PaymentCategory, PaymentId, PaymentStatus};

/// Field order matches the `id;account_id;amount;category;status` dump layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub amount: Money,
    pub category: PaymentCategory,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn new(account_id: AccountId, amount: Money, category: PaymentCategory) -> Self {
        Payment {
            id: PaymentId::generate(),
            account_id,
            amount,
            category,
            status: PaymentStatus::InProgress,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == PaymentStatus::Fail
    }
}

/// A saved payment template. Field order matches the
/// `id;account_id;name;amount;category` dump layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub account_id: AccountId,
    pub name: String,
    pub amount: Money,
    pub category: PaymentCategory,
}

impl Favorite {
    pub fn from_payment(payment: &Payment, name: impl Into<String>) -> Self {
        Favorite {
            id: FavoriteId::generate(),
            account_id: payment.account_id,
            name: name.into(),
            amount: payment.amount,
            category: payment.category.clone(),
        }
    }
}
