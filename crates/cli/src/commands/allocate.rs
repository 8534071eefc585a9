//! Allocate a requested quantity across a scenario's batches.
//!
//! # Usage
//!
//! ```bash
//! # Allocate the scenario's own quantity
//! stock-alloc allocate fixtures/amoxicillin.yaml
//!
//! # Allocate 23 units as packs of 10
//! stock-alloc allocate fixtures/amoxicillin.yaml --quantity 2.3 --pack-size 10
//!
//! # Show the save payload as JSON
//! stock-alloc --format json allocate fixtures/amoxicillin.yaml -q 25 --save
//! ```

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use stock_allocation_core::{
    AllocationAlert, AllocationSession, InvoiceId, ItemId, PackSizeChoice,
    SaveStockOutItemLines, parse_quantity,
};

use super::{LineRow, Selection, line_rows, open_session, write_line_table};
use crate::config::AllocationConfig;
use crate::error::CliError;
use crate::output::{OutputFormat, Render, emit};

/// The state of a session after allocation.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    pub pack_size: PackSizeChoice,
    pub allocate_in_doses: bool,
    /// Requested quantity in the unit it was entered in.
    pub requested_quantity: Decimal,
    pub requested_units: Decimal,
    pub allocated_units: Decimal,
    /// Set when allocating in doses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_doses: Option<Decimal>,
    pub placeholder_units: Decimal,
    pub unmet_units: Decimal,
    pub lines: Vec<LineRow>,
    pub alerts: Vec<AllocationAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveStockOutItemLines>,
}

impl AllocationReport {
    #[must_use]
    pub fn from_session(session: &AllocationSession, include_save: bool) -> Self {
        Self {
            invoice_id: session.invoice_id().clone(),
            item_id: session.item().id.clone(),
            pack_size: session.pack_sizes().selected(),
            allocate_in_doses: session.allocate_in_doses(),
            requested_quantity: session.requested_quantity().normalize(),
            requested_units: session.requested_units().normalize(),
            allocated_units: session.allocated_units().normalize(),
            allocated_doses: session
                .allocate_in_doses()
                .then(|| session.allocated_doses().normalize()),
            placeholder_units: session.placeholder_units().normalize(),
            unmet_units: session.unmet_units().normalize(),
            lines: line_rows(session),
            alerts: session.alerts().to_vec(),
            save: include_save.then(|| session.save_input()),
        }
    }
}

impl Render for AllocationReport {
    fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let unit = if self.allocate_in_doses {
            "doses".to_string()
        } else {
            match self.pack_size {
                PackSizeChoice::Any => "units".to_string(),
                PackSizeChoice::Size(size) => format!("packs of {size}"),
            }
        };
        writeln!(out, "Item:        {}", self.item_id)?;
        writeln!(out, "Requested:   {} {unit}", self.requested_quantity)?;
        match self.allocated_doses {
            Some(doses) => writeln!(
                out,
                "Allocated:   {} units ({doses} doses)",
                self.allocated_units
            )?,
            None => writeln!(out, "Allocated:   {} units", self.allocated_units)?,
        }
        if !self.placeholder_units.is_zero() {
            writeln!(out, "Unallocated: {} units", self.placeholder_units)?;
        }
        if !self.unmet_units.is_zero() {
            writeln!(out, "Unmet:       {} units", self.unmet_units)?;
        }
        writeln!(out)?;
        write_line_table(out, &self.lines)?;

        if !self.alerts.is_empty() {
            writeln!(out)?;
            for alert in &self.alerts {
                writeln!(out, "[{}] {}", alert.severity, alert.message)?;
            }
        }

        if let Some(save) = &self.save {
            writeln!(out)?;
            writeln!(out, "Save payload:")?;
            for line in &save.lines {
                writeln!(
                    out,
                    "  line {} stock line {}: {} packs",
                    line.id,
                    line.stock_line_id,
                    line.number_of_packs.normalize()
                )?;
            }
            writeln!(out, "  placeholder: {:?}", save.placeholder)?;
        }
        Ok(())
    }
}

/// Run an allocation and print the result.
///
/// `quantity` is raw user input; text that isn't a non-negative number
/// requests zero.
///
/// # Errors
///
/// Returns an error if the scenario can't be loaded or allocation fails.
pub fn run(
    path: &Path,
    config: &AllocationConfig,
    selection: Selection,
    quantity: Option<&str>,
    include_save: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let (scenario, mut session) = open_session(path, config, selection)?;

    let quantity = quantity.map(parse_quantity).or(scenario.quantity);
    if let Some(quantity) = quantity {
        session.input_quantity(quantity, Instant::now());
        session.flush()?;
    }

    tracing::info!(
        item_id = %session.item().id,
        requested = %session.requested_units(),
        allocated = %session.allocated_units(),
        alerts = session.alerts().len(),
        "allocation complete"
    );

    emit(format, &AllocationReport::from_session(&session, include_save))
}
