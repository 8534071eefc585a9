//! Stock lines (batches) as supplied by the backend.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ItemId, LocationId, StockLineId, VvmStatusId};
use super::quantity::ExpiryPolicy;

/// A storage location. Stock in an on-hold location cannot be issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub on_hold: bool,
}

/// Vaccine vial monitor reading for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VvmStatus {
    pub id: VvmStatusId,
    #[serde(default)]
    pub description: String,
    /// The vial has been exposed to enough heat that it must not be used.
    #[serde(default)]
    pub unusable: bool,
}

/// A discrete quantity of one item in one location, with its own expiry,
/// pack size and hold status.
///
/// Owned by the backend and read-only for the length of an editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub id: StockLineId,
    pub item_id: ItemId,
    #[serde(default)]
    pub batch: Option<String>,
    /// Units per pack. Always positive for well-formed records.
    pub pack_size: u32,
    /// Packs not yet reserved by any invoice.
    pub available_number_of_packs: Decimal,
    /// Packs physically in store, reserved or not.
    pub total_number_of_packs: Decimal,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub cost_price_per_pack: Decimal,
    #[serde(default)]
    pub sell_price_per_pack: Decimal,
    #[serde(default)]
    pub volume_per_pack: Decimal,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub vvm_status: Option<VvmStatus>,
}

impl StockLine {
    /// On hold either directly or through its location.
    #[must_use]
    pub fn is_on_hold(&self) -> bool {
        self.on_hold || self.location.as_ref().is_some_and(|l| l.on_hold)
    }

    #[must_use]
    pub fn is_expired(&self, policy: &ExpiryPolicy) -> bool {
        policy.is_expired(self.expiry_date)
    }

    #[must_use]
    pub fn is_vvm_unusable(&self) -> bool {
        self.vvm_status.as_ref().is_some_and(|s| s.unusable)
    }
}
