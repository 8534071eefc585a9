//! User-facing alerts derived from an allocation outcome.
//!
//! Alerts are regenerated after every allocation and never persisted.
//! Several may fire at once.

use rust_decimal::Decimal;
use serde::Serialize;

use super::engine::AllocationOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Part of the request was placed on the placeholder line.
    Shortfall,
    /// Part of the request could not be met and no placeholder was allowed.
    CannotReachRequested,
    /// Whole packs took the allocation past the request.
    OverAllocated,
    /// A line issues a fraction of a pack.
    PartialPack,
    OnHoldStockSkipped,
    ExpiredStockSkipped,
    /// Zero was requested while stock was allocated.
    ConfirmZeroQuantity,
}

impl AlertKind {
    #[must_use]
    pub const fn severity(self) -> AlertSeverity {
        match self {
            Self::CannotReachRequested => AlertSeverity::Error,
            Self::Shortfall | Self::OverAllocated | Self::PartialPack => AlertSeverity::Warning,
            Self::OnHoldStockSkipped | Self::ExpiredStockSkipped | Self::ConfirmZeroQuantity => {
                AlertSeverity::Info
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

impl AllocationAlert {
    fn new(kind: AlertKind, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message,
        }
    }
}

/// Facts about the item that the outcome alone does not carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertContext {
    /// Stock exists but is on hold (batch or location).
    pub has_on_hold_stock: bool,
    /// Stock exists but is expired or within the expiry threshold.
    pub has_expired_stock: bool,
    /// Units allocated before this recompute.
    pub previously_allocated_units: Decimal,
    /// Over-requesting is expected, so don't report an unreachable request.
    pub suppress_over_request: bool,
}

fn fmt(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Build the alerts for an allocation outcome.
#[must_use]
pub fn generate_alerts(outcome: &AllocationOutcome, context: &AlertContext) -> Vec<AllocationAlert> {
    let mut alerts = Vec::new();
    let requested = outcome.requested_units;
    let allocated = outcome.allocated_units;

    if requested.is_zero() {
        if context.previously_allocated_units > Decimal::ZERO {
            alerts.push(AllocationAlert::new(
                AlertKind::ConfirmZeroQuantity,
                format!(
                    "Quantity set to zero. {} allocated units will be removed from this invoice",
                    fmt(context.previously_allocated_units)
                ),
            ));
        }
        return alerts;
    }

    if outcome.placeholder_quantity > Decimal::ZERO {
        alerts.push(AllocationAlert::new(
            AlertKind::Shortfall,
            format!(
                "Not enough stock to allocate {} units. {} units have been added as unallocated stock",
                fmt(requested),
                fmt(outcome.placeholder_quantity)
            ),
        ));
    }

    if outcome.unmet_quantity > Decimal::ZERO && !context.suppress_over_request {
        alerts.push(AllocationAlert::new(
            AlertKind::CannotReachRequested,
            format!(
                "Only {} of the requested {} units could be allocated",
                fmt(allocated),
                fmt(requested)
            ),
        ));
    }

    if allocated > requested {
        alerts.push(AllocationAlert::new(
            AlertKind::OverAllocated,
            format!(
                "Allocated {} units to fill whole packs, {} more than requested",
                fmt(allocated),
                fmt(allocated - requested)
            ),
        ));
    }

    if let Some(line) = outcome
        .lines
        .iter()
        .find(|line| !line.is_placeholder() && !line.number_of_packs.fract().is_zero())
    {
        alerts.push(AllocationAlert::new(
            AlertKind::PartialPack,
            format!(
                "{} packs of size {} is a partial pack; {} whole packs would be issued",
                fmt(line.number_of_packs),
                line.pack_size,
                fmt(line.number_of_packs.ceil())
            ),
        ));
    }

    if context.has_on_hold_stock {
        alerts.push(AllocationAlert::new(
            AlertKind::OnHoldStockSkipped,
            "Some stock is on hold and was not allocated".to_string(),
        ));
    }

    if context.has_expired_stock {
        alerts.push(AllocationAlert::new(
            AlertKind::ExpiredStockSkipped,
            "Some stock is expired or about to expire and was not allocated".to_string(),
        ));
    }

    alerts
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::{DraftStockOutLine, InvoiceId, Item, ItemId};

    fn outcome(requested: i64, allocated: i64, placeholder: i64, unmet: i64) -> AllocationOutcome {
        AllocationOutcome {
            lines: Vec::new(),
            placeholder: None,
            placeholder_quantity: Decimal::from(placeholder),
            unmet_quantity: Decimal::from(unmet),
            requested_units: Decimal::from(requested),
            allocated_units: Decimal::from(allocated),
        }
    }

    fn kinds(alerts: &[AllocationAlert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_exact_allocation_has_no_alerts() {
        let alerts = generate_alerts(&outcome(15, 15, 0, 0), &AlertContext::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_shortfall_warning() {
        let alerts = generate_alerts(&outcome(25, 20, 5, 0), &AlertContext::default());
        assert_eq!(kinds(&alerts), vec![AlertKind::Shortfall]);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert!(alerts[0].message.contains("5 units"));
    }

    #[test]
    fn test_unreachable_request_is_an_error_unless_suppressed() {
        let alerts = generate_alerts(&outcome(25, 20, 0, 5), &AlertContext::default());
        assert_eq!(kinds(&alerts), vec![AlertKind::CannotReachRequested]);
        assert_eq!(alerts[0].severity, AlertSeverity::Error);

        let suppressed = AlertContext {
            suppress_over_request: true,
            ..AlertContext::default()
        };
        assert!(generate_alerts(&outcome(25, 20, 0, 5), &suppressed).is_empty());
    }

    #[test]
    fn test_over_allocation_warning() {
        let alerts = generate_alerts(&outcome(5, 10, 0, 0), &AlertContext::default());
        assert_eq!(kinds(&alerts), vec![AlertKind::OverAllocated]);
    }

    #[test]
    fn test_partial_pack_survives_suppression() {
        let item = Item {
            id: ItemId::new("item"),
            name: String::new(),
            doses_per_unit: 1,
            is_vaccine: false,
        };
        let mut line = DraftStockOutLine::placeholder(&InvoiceId::new("inv"), &item);
        line.line_type = crate::types::InvoiceLineType::StockOut;
        line.pack_size = 10;
        line.number_of_packs = Decimal::new(2, 1);

        let mut result = outcome(7, 2, 0, 5);
        result.lines = vec![line];
        let context = AlertContext {
            suppress_over_request: true,
            ..AlertContext::default()
        };

        let alerts = generate_alerts(&result, &context);
        assert_eq!(kinds(&alerts), vec![AlertKind::PartialPack]);
    }

    #[test]
    fn test_skipped_stock_info() {
        let context = AlertContext {
            has_on_hold_stock: true,
            has_expired_stock: true,
            ..AlertContext::default()
        };
        let alerts = generate_alerts(&outcome(3, 0, 3, 0), &context);
        assert_eq!(
            kinds(&alerts),
            vec![
                AlertKind::Shortfall,
                AlertKind::OnHoldStockSkipped,
                AlertKind::ExpiredStockSkipped
            ]
        );
        assert_eq!(alerts[1].severity, AlertSeverity::Info);
    }

    #[test]
    fn test_zero_request_never_reports_shortfall() {
        let context = AlertContext {
            has_on_hold_stock: true,
            previously_allocated_units: Decimal::from(15),
            ..AlertContext::default()
        };
        let alerts = generate_alerts(&outcome(0, 0, 0, 0), &context);
        assert_eq!(kinds(&alerts), vec![AlertKind::ConfirmZeroQuantity]);

        let alerts = generate_alerts(&outcome(0, 0, 0, 0), &AlertContext::default());
        assert!(alerts.is_empty());
    }
}
