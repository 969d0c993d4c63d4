//! Ledger data model.

use chrono::{DateTime, Utc};
use common::{InvoiceId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confirmation lifecycle state of a payment.
///
/// The status is monotonic: `Pending` may move to `Paid` or `Expired`
/// exactly once, and both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

impl PaymentStatus {
    /// Returns the storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Expired => "expired",
        }
    }

    /// Parses the storage representation back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "expired" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invoice's confirmation lifecycle record.
///
/// `amount` is a snapshot of the product price at invoice-creation time,
/// never a live reference to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// One completed sale. Append-only; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub price: Money,
    pub purchased_at: DateTime<Utc>,
}

/// Denormalized per-user purchase totals.
///
/// Maintained in the same transaction as each purchase insertion, so it
/// always equals the count/sum over that user's purchase rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub purchase_count: i64,
    pub total_spent: Money,
}

impl UserStats {
    /// Stats for a user with no purchases.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            purchase_count: 0,
            total_spent: Money::zero(),
        }
    }
}

/// Shop-wide sales totals for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopStats {
    pub purchase_count: i64,
    pub revenue: Money,
}

/// Outcome of the atomic fulfillment commit for one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// This call won the pending→paid race; the purchase row and the
    /// user aggregate were committed together with the transition.
    Fulfilled { payment: Payment, purchase: Purchase },
    /// The payment was not pending (already paid, expired, or unknown);
    /// nothing was mutated.
    NotPending,
}
