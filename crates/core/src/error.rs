//! Error types for the allocation engine and editing session.
//!
//! Stock shortfall and status restrictions are never errors; they come back
//! as placeholder quantity, unmet quantity and alerts. Only malformed input
//! and rejected direct edits are reported here.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::InvoiceLineId;

/// Programmer errors detected by the allocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The requested quantity must be coerced to a non-negative number
    /// before it reaches the engine.
    #[error("Requested quantity cannot be negative: {0}")]
    NegativeQuantity(Decimal),

    /// A candidate line cannot be allocated from.
    #[error("Malformed line {line_id}: {reason}")]
    MalformedLine {
        line_id: InvoiceLineId,
        reason: String,
    },
}

/// Errors from operations on an [`AllocationSession`](crate::AllocationSession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No draft line with this id exists in the session.
    #[error("Unknown line: {0}")]
    UnknownLine(InvoiceLineId),

    /// The row is on hold, out of stock, of another pack size or does not
    /// match the scanned batch.
    #[error("Line {0} cannot be allocated from")]
    LineDisabled(InvoiceLineId),

    /// Pack counts cannot be negative.
    #[error("Number of packs cannot be negative: {0}")]
    NegativePacks(Decimal),

    /// More packs than the batch has available.
    #[error("Line {line_id} has {available} packs available, {requested} requested")]
    ExceedsAvailable {
        line_id: InvoiceLineId,
        requested: Decimal,
        available: Decimal,
    },

    /// The engine rejected its input.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
