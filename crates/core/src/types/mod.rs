//! Core types for stock allocation.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! allocation engine works with.

pub mod draft;
pub mod id;
pub mod quantity;
pub mod status;
pub mod stock_line;

pub use draft::{DraftStockOutLine, Item, SavedInvoiceLine};
pub use id::*;
pub use quantity::{AllocateIn, ExpiryPolicy, PackRounding, parse_quantity};
pub use status::*;
pub use stock_line::{Location, StockLine, VvmStatus};
