//! YAML scenario files.
//!
//! A scenario describes one item on one invoice: the candidate batches,
//! any lines already saved, and optionally the user's request.
//!
//! ```yaml
//! status: new
//! kind: outbound_shipment
//! today: 2025-01-01
//! item: { id: amox, name: Amoxicillin 250mg }
//! stock_lines:
//!   - { id: A, item_id: amox, batch: A1, pack_size: 1,
//!       available_number_of_packs: 10, total_number_of_packs: 10,
//!       expiry_date: 2025-06-01 }
//! quantity: 15
//! ```

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use stock_allocation_core::{
    InvoiceId, InvoiceStatus, Item, PackSizeChoice, SavedInvoiceLine, SessionInput, StockLine,
    StockOutKind,
};

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub kind: StockOutKind,
    pub item: Item,
    #[serde(default)]
    pub stock_lines: Vec<StockLine>,
    #[serde(default)]
    pub saved_lines: Vec<SavedInvoiceLine>,
    #[serde(default)]
    pub today: Option<NaiveDate>,
    /// Requested quantity, in the unit implied by the other selections.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub pack_size: Option<PackSizeChoice>,
    #[serde(default)]
    pub allocate_in_doses: bool,
    #[serde(default)]
    pub scanned_batch: Option<String>,
    #[serde(default)]
    pub prescribed_quantity: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Scenario {
    /// Read and parse a scenario file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Io` if the file can't be read and
    /// `CliError::Scenario` if it doesn't parse.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = serde_yaml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded scenario");
        Ok(scenario)
    }

    /// Session input for this scenario.
    ///
    /// `today_override` wins over the scenario's own date; without either
    /// the local date is used.
    #[must_use]
    pub fn session_input(&self, today_override: Option<NaiveDate>) -> SessionInput {
        let today = today_override
            .or(self.today)
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        SessionInput {
            invoice_id: self
                .invoice_id
                .clone()
                .unwrap_or_else(InvoiceId::generate),
            status: self.status,
            kind: self.kind,
            item: self.item.clone(),
            stock_lines: self.stock_lines.clone(),
            saved_lines: self.saved_lines.clone(),
            today,
            prescribed_quantity: self.prescribed_quantity,
            note: self.note.clone(),
        }
    }
}
