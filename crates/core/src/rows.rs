//! Partitions candidate lines into allocatable and disabled rows.
//!
//! Lines are sorted by expiry (earliest first, no expiry last) and then
//! placed in exactly one bucket, first match wins:
//!
//! 1. on hold (batch or location)
//! 2. expired, or expiring within the threshold
//! 3. VVM status marks the batch unusable
//! 4. no stock available
//! 5. wrong pack size for the current selection
//! 6. scanned batch mismatch (outbound shipments only)
//! 7. allocatable
//!
//! Only allocatable rows are fed to the engine. The others stay visible but
//! disabled.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::pack_size::PackSizeChoice;
use crate::types::{DraftStockOutLine, ExpiryPolicy, InvoiceLineId, StockOutKind};

/// The bucket a row was placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowBucket {
    Allocatable,
    ScannedBatchMismatch,
    WrongPackSize,
    OnHold,
    Expired,
    Unusable,
    NoStock,
}

impl RowBucket {
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        !matches!(self, Self::Allocatable)
    }
}

impl std::fmt::Display for RowBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allocatable => write!(f, "allocatable"),
            Self::ScannedBatchMismatch => write!(f, "scanned batch mismatch"),
            Self::WrongPackSize => write!(f, "wrong pack size"),
            Self::OnHold => write!(f, "on hold"),
            Self::Expired => write!(f, "expired"),
            Self::Unusable => write!(f, "unusable"),
            Self::NoStock => write!(f, "no stock"),
        }
    }
}

/// What the rows are classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFilter<'a> {
    pub kind: StockOutKind,
    pub pack_size: PackSizeChoice,
    pub scanned_batch: Option<&'a str>,
    pub expiry: ExpiryPolicy,
}

/// Candidate rows split into buckets, each in expiry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedRows<'a> {
    pub placeholder: Option<&'a DraftStockOutLine>,
    pub allocatable: Vec<&'a DraftStockOutLine>,
    pub scanned_batch_mismatch: Vec<&'a DraftStockOutLine>,
    pub wrong_pack_size: Vec<&'a DraftStockOutLine>,
    pub on_hold: Vec<&'a DraftStockOutLine>,
    pub expired: Vec<&'a DraftStockOutLine>,
    pub unusable: Vec<&'a DraftStockOutLine>,
    pub no_stock: Vec<&'a DraftStockOutLine>,
}

impl<'a> ClassifiedRows<'a> {
    /// Rows in display order with their bucket.
    #[must_use]
    pub fn display_order(&self) -> Vec<(&'a DraftStockOutLine, RowBucket)> {
        let tag = |rows: &[&'a DraftStockOutLine], bucket: RowBucket| {
            rows.iter().map(move |line| (*line, bucket)).collect::<Vec<_>>()
        };
        [
            tag(&self.allocatable, RowBucket::Allocatable),
            tag(&self.scanned_batch_mismatch, RowBucket::ScannedBatchMismatch),
            tag(&self.wrong_pack_size, RowBucket::WrongPackSize),
            tag(&self.on_hold, RowBucket::OnHold),
            tag(&self.expired, RowBucket::Expired),
            tag(&self.unusable, RowBucket::Unusable),
            tag(&self.no_stock, RowBucket::NoStock),
        ]
        .concat()
    }

    /// Every row the user cannot allocate from.
    #[must_use]
    pub fn disabled(&self) -> Vec<&'a DraftStockOutLine> {
        self.display_order()
            .into_iter()
            .filter(|(_, bucket)| bucket.is_disabled())
            .map(|(line, _)| line)
            .collect()
    }

    #[must_use]
    pub fn bucket_of(&self, line_id: &InvoiceLineId) -> Option<RowBucket> {
        self.display_order()
            .into_iter()
            .find(|(line, _)| &line.id == line_id)
            .map(|(_, bucket)| bucket)
    }

    #[must_use]
    pub fn is_disabled(&self, line_id: &InvoiceLineId) -> bool {
        self.bucket_of(line_id).is_some_and(RowBucket::is_disabled)
    }
}

/// Classify the candidate lines of one item.
#[must_use]
pub fn classify_rows<'a>(lines: &'a [DraftStockOutLine], filter: RowFilter<'_>) -> ClassifiedRows<'a> {
    let mut rows = ClassifiedRows {
        placeholder: lines.iter().find(|l| l.is_placeholder()),
        ..ClassifiedRows::default()
    };

    let mut sorted: Vec<&DraftStockOutLine> = lines.iter().filter(|l| !l.is_placeholder()).collect();
    sorted.sort_by_key(|line| (line.expiry_date().is_none(), line.expiry_date()));

    let mut candidates = Vec::with_capacity(sorted.len());
    for line in sorted {
        if line.is_on_hold() {
            rows.on_hold.push(line);
        } else if line.is_expired(&filter.expiry) {
            rows.expired.push(line);
        } else if line.is_vvm_unusable() {
            rows.unusable.push(line);
        } else if line.available_packs <= Decimal::ZERO {
            rows.no_stock.push(line);
        } else if !filter.pack_size.accepts(line.pack_size) {
            rows.wrong_pack_size.push(line);
        } else {
            candidates.push(line);
        }
    }

    let scanned = filter
        .scanned_batch
        .filter(|_| filter.kind.supports_scanned_batch())
        .filter(|batch| candidates.iter().any(|line| line.batch() == Some(*batch)));

    match scanned {
        Some(batch) => {
            let (matching, mismatched): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .partition(|line| line.batch() == Some(batch));
            rows.allocatable = matching;
            rows.scanned_batch_mismatch = mismatched;
        }
        None => rows.allocatable = candidates,
    }

    rows
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{
        InvoiceId, Item, ItemId, Location, LocationId, StockLine, StockLineId, VvmStatus,
        VvmStatusId,
    };

    fn item() -> Item {
        Item {
            id: ItemId::new("item"),
            name: String::new(),
            doses_per_unit: 1,
            is_vaccine: false,
        }
    }

    fn line(batch: &str, pack_size: u32, available: i64, expiry: Option<(i32, u32, u32)>) -> DraftStockOutLine {
        let stock_line = StockLine {
            id: StockLineId::new(batch),
            item_id: ItemId::new("item"),
            batch: Some(batch.to_string()),
            pack_size,
            available_number_of_packs: Decimal::from(available),
            total_number_of_packs: Decimal::from(available),
            expiry_date: expiry.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            on_hold: false,
            cost_price_per_pack: Decimal::ZERO,
            sell_price_per_pack: Decimal::ZERO,
            volume_per_pack: Decimal::ZERO,
            location: None,
            vvm_status: None,
        };
        let mut draft = DraftStockOutLine::from_stock_line(&InvoiceId::new("inv"), &item(), &stock_line);
        draft.id = InvoiceLineId::new(batch);
        draft
    }

    fn filter(pack_size: PackSizeChoice) -> RowFilter<'static> {
        RowFilter {
            kind: StockOutKind::OutboundShipment,
            pack_size,
            scanned_batch: None,
            expiry: ExpiryPolicy::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 0),
        }
    }

    fn batches(rows: &[&DraftStockOutLine]) -> Vec<String> {
        rows.iter().map(|l| l.batch().unwrap_or_default().to_string()).collect()
    }

    #[test]
    fn test_allocatable_rows_are_in_expiry_order() {
        let lines = vec![
            line("none", 1, 5, None),
            line("late", 1, 5, Some((2026, 1, 1))),
            line("early", 1, 5, Some((2025, 1, 1))),
        ];

        let rows = classify_rows(&lines, filter(PackSizeChoice::Any));
        assert_eq!(batches(&rows.allocatable), vec!["early", "late", "none"]);
        assert!(rows.disabled().is_empty());
    }

    #[test]
    fn test_bucket_precedence() {
        let mut held_empty = line("held_empty", 10, 0, None);
        held_empty.location = Some(Location {
            id: LocationId::new("quarantine"),
            name: "Quarantine".to_string(),
            on_hold: true,
        });
        let lines = vec![
            held_empty,
            line("empty_wrong_size", 10, 0, None),
            line("wrong_size", 10, 5, None),
            line("ok", 1, 5, None),
        ];

        let rows = classify_rows(&lines, filter(PackSizeChoice::Size(1)));
        assert_eq!(batches(&rows.on_hold), vec!["held_empty"]);
        assert_eq!(batches(&rows.no_stock), vec!["empty_wrong_size"]);
        assert_eq!(batches(&rows.wrong_pack_size), vec!["wrong_size"]);
        assert_eq!(batches(&rows.allocatable), vec!["ok"]);

        let order: Vec<RowBucket> = rows.display_order().into_iter().map(|(_, b)| b).collect();
        assert_eq!(
            order,
            vec![
                RowBucket::Allocatable,
                RowBucket::WrongPackSize,
                RowBucket::OnHold,
                RowBucket::NoStock
            ]
        );
        assert!(rows.is_disabled(&InvoiceLineId::new("wrong_size")));
        assert!(!rows.is_disabled(&InvoiceLineId::new("ok")));
    }

    #[test]
    fn test_expired_and_unusable_batches_are_disabled() {
        let mut spoiled = line("spoiled", 1, 5, Some((2026, 1, 1)));
        spoiled.stock_line.as_mut().unwrap().vvm_status = Some(VvmStatus {
            id: VvmStatusId::new("stage-4"),
            description: "Discard".to_string(),
            unusable: true,
        });
        let lines = vec![
            line("expired", 1, 5, Some((2024, 12, 1))),
            spoiled,
            line("expired_empty", 1, 0, Some((2024, 11, 1))),
            line("ok", 1, 5, Some((2025, 6, 1))),
        ];

        let rows = classify_rows(&lines, filter(PackSizeChoice::Any));
        assert_eq!(batches(&rows.expired), vec!["expired_empty", "expired"]);
        assert_eq!(batches(&rows.unusable), vec!["spoiled"]);
        assert_eq!(batches(&rows.allocatable), vec!["ok"]);
        assert!(rows.no_stock.is_empty());
        assert_eq!(
            rows.bucket_of(&InvoiceLineId::new("spoiled")),
            Some(RowBucket::Unusable)
        );
        assert!(rows.is_disabled(&InvoiceLineId::new("expired")));
    }

    #[test]
    fn test_scanned_batch_restricts_when_it_matches() {
        let lines = vec![line("A", 1, 5, None), line("B", 1, 5, None)];
        let rows = classify_rows(
            &lines,
            RowFilter {
                scanned_batch: Some("B"),
                ..filter(PackSizeChoice::Any)
            },
        );
        assert_eq!(batches(&rows.allocatable), vec!["B"]);
        assert_eq!(batches(&rows.scanned_batch_mismatch), vec!["A"]);
    }

    #[test]
    fn test_unmatched_scan_is_ignored() {
        let lines = vec![line("A", 1, 5, None), line("B", 1, 5, None)];
        let rows = classify_rows(
            &lines,
            RowFilter {
                scanned_batch: Some("Z"),
                ..filter(PackSizeChoice::Any)
            },
        );
        assert_eq!(batches(&rows.allocatable), vec!["A", "B"]);
        assert!(rows.scanned_batch_mismatch.is_empty());
    }

    #[test]
    fn test_prescriptions_ignore_scanned_batch() {
        let lines = vec![line("A", 1, 5, None), line("B", 1, 5, None)];
        let rows = classify_rows(
            &lines,
            RowFilter {
                kind: StockOutKind::Prescription,
                scanned_batch: Some("B"),
                ..filter(PackSizeChoice::Any)
            },
        );
        assert_eq!(rows.allocatable.len(), 2);
    }

    #[test]
    fn test_placeholder_is_set_aside() {
        let mut lines = vec![line("A", 1, 5, None)];
        lines.push(DraftStockOutLine::placeholder(&InvoiceId::new("inv"), &item()));

        let rows = classify_rows(&lines, filter(PackSizeChoice::Any));
        assert!(rows.placeholder.is_some());
        assert_eq!(rows.display_order().len(), 1);
        assert_eq!(rows.allocatable[0].batch(), Some("A"));
    }
}
