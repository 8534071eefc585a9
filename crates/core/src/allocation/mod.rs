//! The allocation engine and the alerts that explain its result.

mod alerts;
mod engine;

pub use alerts::{AlertContext, AlertKind, AlertSeverity, AllocationAlert, generate_alerts};
pub use engine::{
    AllocateOptions, Allocation, AllocationOutcome, PlaceholderPolicy, allocate,
    allocate_quantities,
};
