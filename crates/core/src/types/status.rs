//! Status enums for invoices and invoice lines.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an outbound shipment or prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    New,
    Allocated,
    Picked,
    Shipped,
    Delivered,
    Received,
    Verified,
    Cancelled,
}

impl InvoiceStatus {
    /// Whether unmet quantity may be parked on an unallocated-stock line.
    ///
    /// Once stock has been allocated the shipment is committed to real
    /// batches, so only `New` invoices accept placeholder quantity.
    #[must_use]
    pub const fn allows_placeholder(self) -> bool {
        matches!(self, Self::New)
    }

    /// Whether lines of the invoice can still be edited.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::New | Self::Allocated | Self::Picked)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Allocated => write!(f, "allocated"),
            Self::Picked => write!(f, "picked"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Received => write!(f, "received"),
            Self::Verified => write!(f, "verified"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "allocated" => Ok(Self::Allocated),
            "picked" => Ok(Self::Picked),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "received" => Ok(Self::Received),
            "verified" => Ok(Self::Verified),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid invoice status: {s}")),
        }
    }
}

/// Type of an invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceLineType {
    /// Stock issued from a real batch.
    #[default]
    StockOut,
    /// Requested quantity with no batch behind it (the placeholder line).
    UnallocatedStock,
}

/// The kind of stock-out document being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockOutKind {
    #[default]
    OutboundShipment,
    Prescription,
}

impl StockOutKind {
    /// Prescriptions are dispensed from stock on hand and never carry
    /// unallocated quantity.
    #[must_use]
    pub const fn supports_placeholder(self) -> bool {
        matches!(self, Self::OutboundShipment)
    }

    /// Barcode scanning is only wired into the outbound shipment flow.
    #[must_use]
    pub const fn supports_scanned_batch(self) -> bool {
        matches!(self, Self::OutboundShipment)
    }
}

impl std::fmt::Display for StockOutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutboundShipment => write!(f, "outbound_shipment"),
            Self::Prescription => write!(f, "prescription"),
        }
    }
}
