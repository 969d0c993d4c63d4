//! Ledger storage trait.

use async_trait::async_trait;
use common::{InvoiceId, Money, ProductId, UserId};

use crate::{Payment, Purchase, Result, Settlement, ShopStats, UserStats};

/// Storage interface for the payment and purchase ledgers.
///
/// All shared mutable payment/purchase state goes through this trait;
/// no other component writes the underlying tables. Both implementations
/// give the conditional transitions linearizable semantics per invoice id
/// without any cross-invoice serialization.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Records a new pending payment for an invoice.
    ///
    /// Fails with [`crate::LedgerError::DuplicateInvoice`] without mutating
    /// anything if a payment for this invoice id already exists.
    async fn create_pending(
        &self,
        user_id: UserId,
        product_id: ProductId,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<Payment>;

    /// The bare compare-and-set: transitions pending→paid as one
    /// indivisible storage operation.
    ///
    /// Returns `true` only if this call performed the transition; `false`
    /// if the payment was not pending (already paid, expired, or not
    /// found). Under concurrent callers racing on one invoice id, exactly
    /// one observes `true`.
    async fn mark_paid_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool>;

    /// Transitions pending→expired with the same compare-and-set
    /// semantics, so a lapsed invoice stops being polled.
    async fn mark_expired_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool>;

    /// Looks up a payment by invoice id.
    async fn lookup(&self, invoice_id: &InvoiceId) -> Result<Option<Payment>>;

    /// The fulfillment commit: in one storage transaction, performs the
    /// pending→paid conditional transition, appends the purchase row, and
    /// updates the user aggregate.
    ///
    /// The single race winner gets [`Settlement::Fulfilled`]; every other
    /// caller gets [`Settlement::NotPending`]. A storage failure rolls the
    /// whole transaction back, so the ledger never holds a paid payment
    /// without its purchase row, or vice versa.
    async fn settle_if_pending(&self, invoice_id: &InvoiceId) -> Result<Settlement>;

    /// Lists a user's purchases, newest first.
    async fn purchases_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>>;

    /// Returns the denormalized purchase totals for a user.
    async fn user_stats(&self, user_id: UserId) -> Result<UserStats>;

    /// Returns shop-wide sales totals.
    async fn shop_stats(&self) -> Result<ShopStats>;
}
