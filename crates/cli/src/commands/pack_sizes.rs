//! List the pack sizes offered for a scenario's item.
//!
//! # Usage
//!
//! ```bash
//! stock-alloc pack-sizes fixtures/amoxicillin.yaml
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use stock_allocation_core::{PackSizeChoice, PackSizeOption};

use super::{Selection, open_session};
use crate::config::AllocationConfig;
use crate::error::CliError;
use crate::output::{OutputFormat, Render, emit};

#[derive(Debug, Clone, Serialize)]
pub struct PackSizeReport {
    pub options: Vec<PackSizeOption>,
    pub selected: PackSizeChoice,
}

impl Render for PackSizeReport {
    fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
        if self.options.is_empty() {
            return writeln!(out, "No pack sizes available");
        }
        for option in &self.options {
            let marker = if option.choice == self.selected { '*' } else { ' ' };
            writeln!(out, "{marker} {}", option.label)?;
        }
        Ok(())
    }
}

/// Print the pack-size options and the initial selection.
///
/// # Errors
///
/// Returns an error if the scenario can't be loaded.
pub fn run(path: &Path, config: &AllocationConfig, format: OutputFormat) -> Result<(), CliError> {
    let (_, session) = open_session(path, config, Selection::default())?;
    let report = PackSizeReport {
        options: session.pack_sizes().options().to_vec(),
        selected: session.pack_sizes().selected(),
    };
    emit(format, &report)
}
