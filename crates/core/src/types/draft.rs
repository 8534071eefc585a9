//! Draft stock-out lines edited during an allocation session.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{InvoiceId, InvoiceLineId, ItemId, VvmStatusId};
use super::quantity::ExpiryPolicy;
use super::status::{InvoiceLineType, InvoiceStatus};
use super::stock_line::{Location, StockLine};

/// The item being issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    /// Doses in one unit. 1 for items that are not dispensed per dose.
    #[serde(default = "default_doses_per_unit")]
    pub doses_per_unit: u32,
    #[serde(default)]
    pub is_vaccine: bool,
}

const fn default_doses_per_unit() -> u32 {
    1
}

/// An invoice line already persisted for the item, as returned by the
/// backend when an edit is resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedInvoiceLine {
    pub id: InvoiceLineId,
    #[serde(default, rename = "type")]
    pub line_type: InvoiceLineType,
    pub number_of_packs: Decimal,
    #[serde(default = "default_pack_size")]
    pub pack_size: u32,
    /// Absent for unallocated-stock lines.
    #[serde(default)]
    pub stock_line: Option<StockLine>,
    #[serde(default)]
    pub vvm_status_id: Option<VvmStatusId>,
}

const fn default_pack_size() -> u32 {
    1
}

/// A line being built or edited for an outbound shipment or prescription.
///
/// Either references a real [`StockLine`] or is the placeholder
/// (unallocated-stock) line that carries quantity no batch could supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStockOutLine {
    pub id: InvoiceLineId,
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    #[serde(rename = "type")]
    pub line_type: InvoiceLineType,
    pub stock_line: Option<StockLine>,
    pub number_of_packs: Decimal,
    pub pack_size: u32,
    pub location: Option<Location>,
    pub doses_per_unit: u32,
    /// Packs this session may issue from the batch.
    pub available_packs: Decimal,
    /// Packs physically present in the store.
    pub in_store_packs: Decimal,
    pub vvm_status_id: Option<VvmStatusId>,
    /// Not yet persisted.
    pub is_created: bool,
    /// Changed since the session opened.
    pub is_updated: bool,
}

impl DraftStockOutLine {
    /// A fresh, zero-allocated line for a batch not yet on the invoice.
    #[must_use]
    pub fn from_stock_line(invoice_id: &InvoiceId, item: &Item, stock_line: &StockLine) -> Self {
        Self {
            id: InvoiceLineId::generate(),
            invoice_id: invoice_id.clone(),
            item_id: stock_line.item_id.clone(),
            line_type: InvoiceLineType::StockOut,
            stock_line: Some(stock_line.clone()),
            number_of_packs: Decimal::ZERO,
            pack_size: stock_line.pack_size,
            location: stock_line.location.clone(),
            doses_per_unit: item.doses_per_unit,
            available_packs: stock_line.available_number_of_packs,
            in_store_packs: stock_line.total_number_of_packs,
            vvm_status_id: stock_line.vvm_status.as_ref().map(|s| s.id.clone()),
            is_created: true,
            is_updated: false,
        }
    }

    /// Resume a persisted stock-out line.
    ///
    /// Packs already reserved by this invoice are available again for the
    /// session. Until the invoice is picked they are still counted in the
    /// batch total, afterwards they have left the store total and are added
    /// back.
    #[must_use]
    pub fn from_invoice_line(
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
        item: &Item,
        line: &SavedInvoiceLine,
        stock_line: &StockLine,
    ) -> Self {
        let in_store_packs = match status {
            InvoiceStatus::New | InvoiceStatus::Allocated => stock_line.total_number_of_packs,
            _ => stock_line.total_number_of_packs + line.number_of_packs,
        };

        Self {
            id: line.id.clone(),
            invoice_id: invoice_id.clone(),
            item_id: stock_line.item_id.clone(),
            line_type: InvoiceLineType::StockOut,
            stock_line: Some(stock_line.clone()),
            number_of_packs: line.number_of_packs,
            pack_size: stock_line.pack_size,
            location: stock_line.location.clone(),
            doses_per_unit: item.doses_per_unit,
            available_packs: stock_line.available_number_of_packs + line.number_of_packs,
            in_store_packs,
            vvm_status_id: line
                .vvm_status_id
                .clone()
                .or_else(|| stock_line.vvm_status.as_ref().map(|s| s.id.clone())),
            is_created: false,
            is_updated: false,
        }
    }

    /// A machine-generated placeholder holding no quantity.
    #[must_use]
    pub fn placeholder(invoice_id: &InvoiceId, item: &Item) -> Self {
        Self::unallocated(InvoiceLineId::generate(), invoice_id, item, Decimal::ZERO, true)
    }

    /// Resume a persisted placeholder line.
    #[must_use]
    pub fn saved_placeholder(
        invoice_id: &InvoiceId,
        item: &Item,
        line_id: InvoiceLineId,
        number_of_packs: Decimal,
    ) -> Self {
        Self::unallocated(line_id, invoice_id, item, number_of_packs, false)
    }

    fn unallocated(
        id: InvoiceLineId,
        invoice_id: &InvoiceId,
        item: &Item,
        number_of_packs: Decimal,
        is_created: bool,
    ) -> Self {
        Self {
            id,
            invoice_id: invoice_id.clone(),
            item_id: item.id.clone(),
            line_type: InvoiceLineType::UnallocatedStock,
            stock_line: None,
            number_of_packs,
            pack_size: 1,
            location: None,
            doses_per_unit: item.doses_per_unit,
            available_packs: Decimal::ZERO,
            in_store_packs: Decimal::ZERO,
            vvm_status_id: None,
            is_created,
            is_updated: false,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.line_type == InvoiceLineType::UnallocatedStock
    }

    /// On hold through the batch, the batch's location or the line's own
    /// location.
    #[must_use]
    pub fn is_on_hold(&self) -> bool {
        self.stock_line.as_ref().is_some_and(StockLine::is_on_hold)
            || self.location.as_ref().is_some_and(|l| l.on_hold)
    }

    #[must_use]
    pub fn is_expired(&self, policy: &ExpiryPolicy) -> bool {
        policy.is_expired(self.expiry_date())
    }

    #[must_use]
    pub fn is_vvm_unusable(&self) -> bool {
        self.stock_line.as_ref().is_some_and(StockLine::is_vvm_unusable)
    }

    #[must_use]
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.stock_line.as_ref().and_then(|s| s.expiry_date)
    }

    #[must_use]
    pub fn batch(&self) -> Option<&str> {
        self.stock_line.as_ref().and_then(|s| s.batch.as_deref())
    }

    /// Allocated quantity in units.
    #[must_use]
    pub fn units(&self) -> Decimal {
        self.number_of_packs * Decimal::from(self.pack_size)
    }

    /// Allocated quantity in doses.
    #[must_use]
    pub fn doses(&self) -> Decimal {
        self.units() * Decimal::from(self.doses_per_unit)
    }

    #[must_use]
    pub fn available_units(&self) -> Decimal {
        self.available_packs * Decimal::from(self.pack_size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::id::{LocationId, StockLineId};

    fn item() -> Item {
        Item {
            id: ItemId::new("item_a"),
            name: "Amoxicillin 250mg".to_string(),
            doses_per_unit: 1,
            is_vaccine: false,
        }
    }

    fn stock_line(available: i64, total: i64) -> StockLine {
        StockLine {
            id: StockLineId::new("sl1"),
            item_id: ItemId::new("item_a"),
            batch: Some("B1".to_string()),
            pack_size: 10,
            available_number_of_packs: Decimal::from(available),
            total_number_of_packs: Decimal::from(total),
            expiry_date: None,
            on_hold: false,
            cost_price_per_pack: Decimal::ZERO,
            sell_price_per_pack: Decimal::ZERO,
            volume_per_pack: Decimal::ZERO,
            location: None,
            vvm_status: None,
        }
    }

    fn saved_line(packs: i64) -> SavedInvoiceLine {
        SavedInvoiceLine {
            id: InvoiceLineId::new("line1"),
            line_type: InvoiceLineType::StockOut,
            number_of_packs: Decimal::from(packs),
            pack_size: 10,
            stock_line: None,
            vvm_status_id: None,
        }
    }

    #[test]
    fn test_from_stock_line_starts_unallocated() {
        let draft = DraftStockOutLine::from_stock_line(
            &InvoiceId::new("inv"),
            &item(),
            &stock_line(5, 8),
        );

        assert!(draft.is_created);
        assert!(!draft.is_updated);
        assert_eq!(draft.number_of_packs, Decimal::ZERO);
        assert_eq!(draft.available_packs, Decimal::from(5));
        assert_eq!(draft.available_units(), Decimal::from(50));
    }

    #[test]
    fn test_saved_line_adds_back_reserved_packs() {
        let invoice_id = InvoiceId::new("inv");
        let stock = stock_line(5, 8);

        let allocated = DraftStockOutLine::from_invoice_line(
            &invoice_id,
            InvoiceStatus::Allocated,
            &item(),
            &saved_line(3),
            &stock,
        );
        assert_eq!(allocated.available_packs, Decimal::from(8));
        assert_eq!(allocated.in_store_packs, Decimal::from(8));
        assert_eq!(allocated.units(), Decimal::from(30));
        assert!(!allocated.is_created);

        let picked = DraftStockOutLine::from_invoice_line(
            &invoice_id,
            InvoiceStatus::Picked,
            &item(),
            &saved_line(3),
            &stock,
        );
        assert_eq!(picked.in_store_packs, Decimal::from(11));
    }

    #[test]
    fn test_placeholder_flags() {
        let invoice_id = InvoiceId::new("inv");
        let generated = DraftStockOutLine::placeholder(&invoice_id, &item());
        assert!(generated.is_placeholder());
        assert!(generated.is_created);
        assert_eq!(generated.pack_size, 1);

        let saved = DraftStockOutLine::saved_placeholder(
            &invoice_id,
            &item(),
            InvoiceLineId::new("ph"),
            Decimal::from(4),
        );
        assert!(!saved.is_created);
        assert_eq!(saved.units(), Decimal::from(4));
    }

    #[test]
    fn test_line_location_hold() {
        let mut draft = DraftStockOutLine::from_stock_line(
            &InvoiceId::new("inv"),
            &item(),
            &stock_line(5, 5),
        );
        assert!(!draft.is_on_hold());

        draft.location = Some(Location {
            id: LocationId::new("loc"),
            name: String::new(),
            on_hold: true,
        });
        assert!(draft.is_on_hold());
    }

    #[test]
    fn test_doses() {
        let vaccine = Item {
            doses_per_unit: 2,
            is_vaccine: true,
            ..item()
        };
        let mut draft = DraftStockOutLine::from_stock_line(
            &InvoiceId::new("inv"),
            &vaccine,
            &stock_line(5, 5),
        );
        draft.number_of_packs = Decimal::from(3);
        assert_eq!(draft.doses(), Decimal::from(60));
    }
}
