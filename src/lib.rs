//! Kitchen Inventory - Household Perishables Tracker
//!
//! Tracks perishable products with expiry dates in a SQLite database,
//! maintains a shopping list, proxies barcode lookups to Open Food Facts
//! and keeps a scan-count ledger per barcode.

pub mod database;
pub mod error;
pub mod history;
pub mod image_store;
pub mod openfoodfacts;
pub mod products;
pub mod sanitize;
pub mod shopping_list;
pub mod stats;
pub mod web;

pub use database::Database;
pub use error::{AppError, Result};
