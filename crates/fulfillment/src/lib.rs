//! Fulfillment coordinator: turns a confirmed invoice into exactly one
//! recorded sale and one content delivery.
//!
//! The coordinator polls the invoice processor for a status hint and
//! funnels every confirmation through the ledger's atomic settle step, so
//! a "check payment" action stays idempotent no matter how many buyers,
//! admins, or retries invoke it concurrently.

mod coordinator;
mod error;
mod sink;

pub use coordinator::{FulfillmentCoordinator, FulfillmentOutcome, PendingInvoice};
pub use error::{FulfillmentError, Result};
pub use sink::{LogSink, NotificationSink, PurchaseAlert, RecordingSink};
