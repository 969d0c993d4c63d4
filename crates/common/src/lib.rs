//! Shared types used across the shop crates.

mod ids;
mod money;

pub use ids::{InvoiceId, ProductId, UserId};
pub use money::{Money, ParseMoneyError};
