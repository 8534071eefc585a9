//! CLI subcommands.

pub mod allocate;
pub mod pack_sizes;
pub mod rows;

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use stock_allocation_core::{
    AllocationSession, DraftStockOutLine, InvoiceLineId, PackSizeChoice, RowBucket,
};

use crate::config::AllocationConfig;
use crate::error::CliError;
use crate::scenario::Scenario;

/// Selections applied on top of a scenario before it is reported.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub pack_size: Option<PackSizeChoice>,
    pub allocate_in_doses: bool,
    pub scanned_batch: Option<String>,
}

/// Load a scenario and open a session with the selections applied.
///
/// Command-line selections override the scenario's own.
///
/// # Errors
///
/// Returns an error if the scenario can't be loaded, the pack size isn't
/// offered, or the session rejects a selection.
pub fn open_session(
    path: &Path,
    config: &AllocationConfig,
    selection: Selection,
) -> Result<(Scenario, AllocationSession), CliError> {
    let scenario = Scenario::load(path)?;
    let mut session = AllocationSession::open(
        scenario.session_input(config.today),
        config.allocation_options(),
    );

    if let Some(choice) = selection.pack_size.or(scenario.pack_size) {
        if !session.pack_sizes().is_offered(choice) {
            return Err(CliError::PackSizeNotOffered(choice));
        }
        session.set_pack_size(choice)?;
    }
    if selection.allocate_in_doses || scenario.allocate_in_doses {
        session.set_allocate_in_doses(true)?;
    }
    if let Some(batch) = selection.scanned_batch.or_else(|| scenario.scanned_batch.clone()) {
        session.set_scanned_batch(Some(batch))?;
    }

    Ok((scenario, session))
}

/// One row of a line table.
#[derive(Debug, Clone, Serialize)]
pub struct LineRow {
    pub id: InvoiceLineId,
    pub batch: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub pack_size: u32,
    pub number_of_packs: Decimal,
    pub units: Decimal,
    pub available_packs: Decimal,
    pub available_units: Decimal,
    /// `None` for the placeholder line.
    pub bucket: Option<RowBucket>,
}

impl LineRow {
    #[must_use]
    pub fn new(line: &DraftStockOutLine, bucket: Option<RowBucket>) -> Self {
        Self {
            id: line.id.clone(),
            batch: line.batch().map(str::to_string),
            expiry_date: line.expiry_date(),
            pack_size: line.pack_size,
            number_of_packs: line.number_of_packs.normalize(),
            units: line.units().normalize(),
            available_packs: line.available_packs.normalize(),
            available_units: line.available_units().normalize(),
            bucket,
        }
    }
}

/// Rows in display order, with the placeholder last.
#[must_use]
pub fn line_rows(session: &AllocationSession) -> Vec<LineRow> {
    let mut rows: Vec<LineRow> = session
        .rows()
        .display_order()
        .into_iter()
        .map(|(line, bucket)| LineRow::new(line, Some(bucket)))
        .collect();
    if let Some(placeholder) = session.placeholder() {
        rows.push(LineRow::new(placeholder, None));
    }
    rows
}

/// Write rows as a fixed-width table.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_line_table(out: &mut dyn Write, rows: &[LineRow]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<12} {:<11} {:>6} {:>8} {:>8} {:>9}  {}",
        "BATCH", "EXPIRY", "PACK", "PACKS", "UNITS", "AVAILABLE", "STATUS"
    )?;
    for row in rows {
        let batch = match (&row.batch, row.bucket) {
            (_, None) => "(unallocated)".to_string(),
            (Some(batch), _) => batch.clone(),
            (None, _) => "-".to_string(),
        };
        let expiry = row
            .expiry_date
            .map_or_else(|| "-".to_string(), |date| date.to_string());
        let status = row
            .bucket
            .map_or_else(|| "placeholder".to_string(), |bucket| bucket.to_string());
        writeln!(
            out,
            "{:<12} {:<11} {:>6} {:>8} {:>8} {:>9}  {}",
            batch,
            expiry,
            row.pack_size,
            row.number_of_packs.to_string(),
            row.units.to_string(),
            row.available_packs.to_string(),
            status
        )?;
    }
    Ok(())
}
