//! Product catalog for the shop.
//!
//! Read-mostly store of categories and digital products. The fulfillment
//! side only ever reads from here; the write operations exist for shop
//! administration and carry no invariants beyond input validation.

mod error;
mod memory;
mod postgres;
mod product;
mod store;

pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;
pub use product::{Category, NewProduct, Product, ProductKind, ProductPayload};
pub use store::CatalogStore;
