//! Gateway trait and wire-level value types.

use async_trait::async_trait;
use common::{InvoiceId, Money};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Invoice lifecycle state as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// The buyer has completed the payment.
    Paid,
    /// The invoice is open and awaiting payment.
    Pending,
    /// The invoice lapsed without payment.
    Expired,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Paid => f.write_str("paid"),
            InvoiceStatus::Pending => f.write_str("pending"),
            InvoiceStatus::Expired => f.write_str("expired"),
        }
    }
}

/// Result of a successful invoice creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvoice {
    /// The processor-issued correlation key.
    pub invoice_id: InvoiceId,
    /// URL the buyer opens to complete the payment.
    pub pay_url: String,
}

/// Trait for invoice processor operations.
///
/// Implementations must keep both calls free of local side effects:
/// creation only talks to the processor, and polling is safe to repeat
/// arbitrarily often.
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    /// Creates an invoice for the given amount.
    ///
    /// `payload` is an opaque correlation string echoed back by the
    /// processor; we use it to tie the invoice to a (buyer, product) pair.
    async fn create_invoice(
        &self,
        amount: Money,
        description: &str,
        payload: &str,
    ) -> Result<CreatedInvoice>;

    /// Polls the processor for the invoice's current status.
    ///
    /// The answer is a hint, never authoritative for fulfillment.
    async fn poll_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceStatus>;
}
