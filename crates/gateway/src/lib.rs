//! Client for the external crypto invoice processor.
//!
//! The processor exposes a create/poll contract: we create an invoice for a
//! fixed settlement asset and later poll its status. Poll results are an
//! eventually-consistent hint only; the payment ledger's atomic transition
//! is the sole authority for fulfillment.

mod client;
mod error;
mod memory;
mod types;

pub use client::CryptoPayClient;
pub use error::{GatewayError, Result};
pub use memory::InMemoryGateway;
pub use types::{CreatedInvoice, InvoiceGateway, InvoiceStatus};
