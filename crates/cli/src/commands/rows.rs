//! Show how a scenario's batches are classified for display.
//!
//! # Usage
//!
//! ```bash
//! # Rows under the initial pack size
//! stock-alloc rows fixtures/amoxicillin.yaml
//!
//! # Rows after scanning a batch barcode
//! stock-alloc rows fixtures/amoxicillin.yaml --scanned-batch B1
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use stock_allocation_core::PackSizeChoice;

use super::{LineRow, Selection, line_rows, open_session, write_line_table};
use crate::config::AllocationConfig;
use crate::error::CliError;
use crate::output::{OutputFormat, Render, emit};

#[derive(Debug, Clone, Serialize)]
pub struct RowsReport {
    pub pack_size: PackSizeChoice,
    pub scanned_batch: Option<String>,
    pub rows: Vec<LineRow>,
}

impl Render for RowsReport {
    fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Pack size: {}", self.pack_size)?;
        if let Some(batch) = &self.scanned_batch {
            writeln!(out, "Scanned:   {batch}")?;
        }
        writeln!(out)?;
        write_line_table(out, &self.rows)
    }
}

/// Print the classified rows.
///
/// # Errors
///
/// Returns an error if the scenario can't be loaded or a selection is
/// rejected.
pub fn run(
    path: &Path,
    config: &AllocationConfig,
    selection: Selection,
    format: OutputFormat,
) -> Result<(), CliError> {
    let (_, session) = open_session(path, config, selection)?;
    let report = RowsReport {
        pack_size: session.pack_sizes().selected(),
        scanned_batch: session.scanned_batch().map(str::to_string),
        rows: line_rows(&session),
    };
    emit(format, &report)
}
