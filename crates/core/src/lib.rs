//! Stock allocation core - the engine behind outbound shipment and
//! prescription line editing.
//!
//! Given a requested quantity and the candidate stock lines (batches) of an
//! item, this crate decides how much to issue from each batch, parks any
//! shortfall on a single placeholder (unallocated stock) line, and explains
//! the result with user-facing alerts.
//!
//! # Architecture
//!
//! The crate is pure: no I/O, no clocks except the ones callers pass in.
//! Candidate lines come from the backend, and the resulting draft lines are
//! handed back to a save mutation. The backend stays authoritative.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, statuses, quantities, stock lines and draft lines
//! - [`pack_size`] - Which pack size the user is allocating in
//! - [`rows`] - Partitions candidate lines into allocatable and disabled rows
//! - [`allocation`] - The allocation engine and the alert generator
//! - [`session`] - The owned state of one item-editing session
//! - [`debounce`] - Coalesces rapid quantity input before it is applied
//! - [`save`] - The save payload and the backend's rejection variants

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocation;
pub mod debounce;
pub mod error;
pub mod pack_size;
pub mod rows;
pub mod save;
pub mod session;
pub mod types;

pub use allocation::{
    AlertContext, AlertKind, AlertSeverity, AllocateOptions, Allocation, AllocationAlert, AllocationOutcome,
    PlaceholderPolicy, allocate, allocate_quantities, generate_alerts,
};
pub use debounce::Debouncer;
pub use error::{AllocationError, SessionError};
pub use pack_size::{PackSizeChoice, PackSizeController, PackSizeOption};
pub use rows::{ClassifiedRows, RowBucket, RowFilter, classify_rows};
pub use save::{
    PlaceholderChange, PlaceholderError, SaveStockOutInvoiceLine, SaveStockOutItemLines,
    SaveStockOutItemLinesError, StockOutLineError,
};
pub use session::{AllocationOptions, AllocationSession, SessionInput};
pub use types::*;
