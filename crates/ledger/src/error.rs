use thiserror::Error;

use common::InvoiceId;

/// Errors that can occur when interacting with the ledgers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A payment for this invoice id already exists. The pre-existing row
    /// was not mutated; this indicates a caller bug, not data loss.
    #[error("Payment already recorded for invoice {0}")]
    DuplicateInvoice(InvoiceId),

    /// The durable store failed. Fatal to the current request; any open
    /// transaction was rolled back, so no partial commit remains.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
