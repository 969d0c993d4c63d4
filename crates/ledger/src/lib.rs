//! Payment and purchase ledgers.
//!
//! The payment ledger tracks each invoice's confirmation lifecycle; the
//! purchase ledger is the append-only record of completed sales, with a
//! denormalized per-user aggregate. The single concurrency guard in the
//! whole system lives here: the conditional pending→paid transition that
//! admits exactly one winner per invoice id.

mod error;
mod memory;
mod payment;
mod postgres;
mod store;

pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use payment::{Payment, PaymentStatus, Purchase, Settlement, ShopStats, UserStats};
pub use postgres::PostgresLedger;
pub use store::Ledger;
