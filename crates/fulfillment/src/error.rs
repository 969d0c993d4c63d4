use thiserror::Error;

use common::{InvoiceId, ProductId};

/// Errors that can occur while coordinating a purchase.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The product does not exist or is no longer for sale.
    #[error("Product not available: {0}")]
    ProductUnavailable(ProductId),

    /// No payment is recorded for this invoice id.
    #[error("Unknown invoice: {0}")]
    UnknownInvoice(InvoiceId),

    /// The invoice processor failed or refused a request. Gateway errors
    /// during a status poll leave all ledger state untouched.
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),

    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),

    /// A catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
