//! The payload that persists an editing session, and the ways the backend
//! can reject it.
//!
//! The backend is authoritative. It may reject the payload or recompute it;
//! the draft is never reconciled automatically. Errors that mean the draft
//! is stale tell the UI to reopen the edit view.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DraftStockOutLine, InvoiceId, InvoiceLineId, ItemId, StockLineId, VvmStatusId};

/// One stock-out line to insert, update or delete (zero packs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStockOutInvoiceLine {
    pub id: InvoiceLineId,
    pub number_of_packs: Decimal,
    pub stock_line_id: StockLineId,
    pub vvm_status_id: Option<VvmStatusId>,
}

/// What happens to the placeholder line on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaceholderChange {
    Insert {
        id: InvoiceLineId,
        number_of_packs: Decimal,
    },
    /// Also used to zero a previously saved placeholder; those are never
    /// dropped silently.
    Update {
        id: InvoiceLineId,
        number_of_packs: Decimal,
    },
    /// A machine-generated placeholder that ended at zero. Nothing is sent.
    Discard { id: InvoiceLineId },
    NothingToDo,
}

impl PlaceholderChange {
    fn from_draft(placeholder: Option<&DraftStockOutLine>) -> Self {
        let Some(line) = placeholder else {
            return Self::NothingToDo;
        };
        match (line.is_created, line.number_of_packs > Decimal::ZERO) {
            (true, true) => Self::Insert {
                id: line.id.clone(),
                number_of_packs: line.number_of_packs,
            },
            (true, false) => Self::Discard {
                id: line.id.clone(),
            },
            (false, _) if line.is_updated => Self::Update {
                id: line.id.clone(),
                number_of_packs: line.number_of_packs,
            },
            (false, _) => Self::NothingToDo,
        }
    }

    /// Placeholder quantity the save mutation should carry, if any.
    #[must_use]
    pub const fn quantity(&self) -> Option<Decimal> {
        match self {
            Self::Insert {
                number_of_packs, ..
            }
            | Self::Update {
                number_of_packs, ..
            } => Some(*number_of_packs),
            Self::Discard { .. } | Self::NothingToDo => None,
        }
    }
}

/// Input of the single save mutation for one item on one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStockOutItemLines {
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    pub lines: Vec<SaveStockOutInvoiceLine>,
    pub placeholder: PlaceholderChange,
    pub prescribed_quantity: Option<Decimal>,
    pub note: Option<String>,
}

impl SaveStockOutItemLines {
    /// Diff the draft lines into a save payload.
    ///
    /// Lines with packs are sent, as are previously saved lines that
    /// changed, so a saved line edited down to zero is deleted by the
    /// backend. New lines left at zero are omitted.
    #[must_use]
    pub fn from_drafts(
        invoice_id: InvoiceId,
        item_id: ItemId,
        lines: &[DraftStockOutLine],
        placeholder: Option<&DraftStockOutLine>,
    ) -> Self {
        let lines = lines
            .iter()
            .filter(|line| !line.is_placeholder())
            .filter(|line| line.number_of_packs > Decimal::ZERO || (!line.is_created && line.is_updated))
            .filter_map(|line| {
                line.stock_line.as_ref().map(|stock_line| SaveStockOutInvoiceLine {
                    id: line.id.clone(),
                    number_of_packs: line.number_of_packs,
                    stock_line_id: stock_line.id.clone(),
                    vvm_status_id: line.vvm_status_id.clone(),
                })
            })
            .collect();

        Self {
            invoice_id,
            item_id,
            lines,
            placeholder: PlaceholderChange::from_draft(placeholder),
            prescribed_quantity: None,
            note: None,
        }
    }

    #[must_use]
    pub const fn with_prescribed_quantity(mut self, quantity: Option<Decimal>) -> Self {
        self.prescribed_quantity = quantity;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// Why the backend rejected a stock-out line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StockOutLineError {
    #[error("Cannot edit a finalised invoice")]
    CannotEditFinalised,

    #[error("Stock line not found")]
    StockLineNotFound,

    #[error("Invoice line does not exist")]
    LineDoesNotExist,

    #[error("Number of packs cannot be below zero")]
    NumberOfPacksBelowZero,

    #[error("Location is on hold")]
    LocationIsOnHold,

    #[error("Location not found")]
    LocationNotFound,

    #[error("Batch is on hold")]
    BatchIsOnHold,

    #[error("Stock line is already used by invoice line {line_id}")]
    StockLineAlreadyExistsInInvoice { line_id: InvoiceLineId },

    /// Another user reserved the stock since the session opened.
    #[error("Not enough stock left in stock line {stock_line_id}")]
    ReductionBelowZero { stock_line_id: StockLineId },
}

impl StockOutLineError {
    const fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::StockLineNotFound
                | Self::LineDoesNotExist
                | Self::StockLineAlreadyExistsInInvoice { .. }
                | Self::ReductionBelowZero { .. }
        )
    }
}

/// Why the backend rejected the placeholder change.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaceholderError {
    #[error("An unallocated line already exists for this item")]
    LineAlreadyExists,

    #[error("Unallocated line not found")]
    LineNotFound,

    #[error("Line is not an unallocated line")]
    NotAnUnallocatedLine,

    #[error("Unallocated lines can only be edited on new shipments")]
    CanOnlyEditNewShipments,
}

/// Rejections of [`SaveStockOutItemLines`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveStockOutItemLinesError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Invoice type cannot issue stock")]
    InvalidInvoiceType,

    #[error("Invoice does not belong to the current store")]
    InvoiceDoesNotBelongToCurrentStore,

    #[error("Invoice is no longer editable")]
    InvoiceNotEditable,

    #[error("Invoice is not a stock-out invoice")]
    NotAStockOutInvoice,

    #[error("Shipment was removed while editing")]
    UpdatedShipmentDoesNotExist,

    #[error("Could not add line {line_id}: {error}")]
    LineInsertError {
        line_id: InvoiceLineId,
        error: StockOutLineError,
    },

    #[error("Could not update line {line_id}: {error}")]
    LineUpdateError {
        line_id: InvoiceLineId,
        error: StockOutLineError,
    },

    #[error("Could not delete line {line_id}: {error}")]
    LineDeleteError {
        line_id: InvoiceLineId,
        error: StockOutLineError,
    },

    #[error("Could not save unallocated quantity: {error}")]
    PlaceholderError { error: PlaceholderError },

    #[error("Could not set prescribed quantity: {message}")]
    PrescribedQuantityError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },
}

impl SaveStockOutItemLinesError {
    /// The draft no longer matches the backend and the edit view must be
    /// reopened for fresh state.
    #[must_use]
    pub const fn requires_reopen(&self) -> bool {
        match self {
            Self::InvoiceNotFound
            | Self::InvoiceDoesNotBelongToCurrentStore
            | Self::InvoiceNotEditable
            | Self::UpdatedShipmentDoesNotExist => true,
            Self::LineInsertError { error, .. }
            | Self::LineUpdateError { error, .. }
            | Self::LineDeleteError { error, .. } => error.is_stale(),
            Self::PlaceholderError { error } => {
                matches!(error, PlaceholderError::LineNotFound | PlaceholderError::LineAlreadyExists)
            }
            Self::InvalidInvoiceType
            | Self::NotAStockOutInvoice
            | Self::PrescribedQuantityError { .. }
            | Self::DatabaseError { .. } => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::{InvoiceStatus, Item, SavedInvoiceLine, StockLine};

    fn item() -> Item {
        Item {
            id: ItemId::new("item"),
            name: String::new(),
            doses_per_unit: 1,
            is_vaccine: false,
        }
    }

    fn stock_line(id: &str) -> StockLine {
        StockLine {
            id: StockLineId::new(id),
            item_id: ItemId::new("item"),
            batch: None,
            pack_size: 1,
            available_number_of_packs: Decimal::from(10),
            total_number_of_packs: Decimal::from(10),
            expiry_date: None,
            on_hold: false,
            cost_price_per_pack: Decimal::ZERO,
            sell_price_per_pack: Decimal::ZERO,
            volume_per_pack: Decimal::ZERO,
            location: None,
            vvm_status: None,
        }
    }

    fn new_line(id: &str, packs: i64) -> DraftStockOutLine {
        let mut line = DraftStockOutLine::from_stock_line(&InvoiceId::new("inv"), &item(), &stock_line(id));
        line.number_of_packs = Decimal::from(packs);
        line.is_updated = packs > 0;
        line
    }

    fn saved_line(id: &str, saved_packs: i64, packs: i64) -> DraftStockOutLine {
        let saved = SavedInvoiceLine {
            id: InvoiceLineId::new(id),
            line_type: crate::types::InvoiceLineType::StockOut,
            number_of_packs: Decimal::from(saved_packs),
            pack_size: 1,
            stock_line: None,
            vvm_status_id: None,
        };
        let mut line = DraftStockOutLine::from_invoice_line(
            &InvoiceId::new("inv"),
            InvoiceStatus::New,
            &item(),
            &saved,
            &stock_line(id),
        );
        line.is_updated = saved_packs != packs;
        line.number_of_packs = Decimal::from(packs);
        line
    }

    fn save(lines: &[DraftStockOutLine], placeholder: Option<&DraftStockOutLine>) -> SaveStockOutItemLines {
        SaveStockOutItemLines::from_drafts(InvoiceId::new("inv"), ItemId::new("item"), lines, placeholder)
    }

    #[test]
    fn test_diff_includes_allocated_and_zeroed_saved_lines() {
        let lines = [
            new_line("fresh", 4),
            new_line("untouched", 0),
            saved_line("zeroed", 3, 0),
            saved_line("unchanged", 2, 2),
        ];

        let payload = save(&lines, None);
        let ids: Vec<&str> = payload.lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], "zeroed");
        assert_eq!(ids[2], "unchanged");
        assert_eq!(payload.lines[1].number_of_packs, Decimal::ZERO);
        assert_eq!(payload.lines[0].stock_line_id, StockLineId::new("fresh"));
        assert_eq!(payload.placeholder, PlaceholderChange::NothingToDo);
    }

    #[test]
    fn test_generated_placeholder() {
        let mut placeholder = DraftStockOutLine::placeholder(&InvoiceId::new("inv"), &item());
        assert!(matches!(
            save(&[], Some(&placeholder)).placeholder,
            PlaceholderChange::Discard { .. }
        ));

        placeholder.number_of_packs = Decimal::from(5);
        let change = save(&[], Some(&placeholder)).placeholder;
        assert!(matches!(change, PlaceholderChange::Insert { .. }));
        assert_eq!(change.quantity(), Some(Decimal::from(5)));
    }

    #[test]
    fn test_saved_placeholder_zeroed_is_updated_not_discarded() {
        let mut placeholder = DraftStockOutLine::saved_placeholder(
            &InvoiceId::new("inv"),
            &item(),
            InvoiceLineId::new("ph"),
            Decimal::from(5),
        );
        assert_eq!(save(&[], Some(&placeholder)).placeholder, PlaceholderChange::NothingToDo);

        placeholder.number_of_packs = Decimal::ZERO;
        placeholder.is_updated = true;
        assert_eq!(
            save(&[], Some(&placeholder)).placeholder,
            PlaceholderChange::Update {
                id: InvoiceLineId::new("ph"),
                number_of_packs: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_error_tags_and_reopen() {
        let error = SaveStockOutItemLinesError::LineUpdateError {
            line_id: InvoiceLineId::new("line_a"),
            error: StockOutLineError::ReductionBelowZero {
                stock_line_id: StockLineId::new("sl"),
            },
        };
        assert!(error.requires_reopen());
        assert_eq!(
            error.to_string(),
            "Could not update line line_a: Not enough stock left in stock line sl"
        );

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "line_update_error");
        assert_eq!(json["error"]["type"], "reduction_below_zero");

        let back: SaveStockOutItemLinesError = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);

        assert!(!SaveStockOutItemLinesError::DatabaseError {
            message: "timeout".to_string()
        }
        .requires_reopen());
        assert!(SaveStockOutItemLinesError::InvoiceNotEditable.requires_reopen());
    }
}
