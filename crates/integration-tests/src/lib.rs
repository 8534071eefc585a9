//! Integration tests for the stock allocation engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stock-allocation-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `scenarios` - End-to-end allocation scenarios from the YAML fixtures
//! - `properties` - Invariants checked across many requests
//! - `session_flow` - Editing flows: pack sizes, doses, manual edits, save
//!
//! Fixtures live in the workspace `fixtures/` directory and are shared with
//! the CLI.

#![allow(clippy::missing_panics_doc)]

use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stock_allocation_core::{
    AllocationOptions, AllocationSession, InvoiceId, InvoiceStatus, Item, ItemId, Location,
    LocationId, SessionInput, StockLine, StockLineId, StockOutKind,
};

/// Path of a fixture in the workspace `fixtures/` directory.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

/// Load a fixture as session input.
///
/// Scenario-only keys such as `quantity` are ignored.
#[must_use]
pub fn load_fixture(name: &str) -> SessionInput {
    let path = fixture_path(name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Should read fixture {}: {e}", path.display()));
    serde_yaml::from_str(&contents)
        .unwrap_or_else(|e| panic!("Should parse fixture {}: {e}", path.display()))
}

/// Open a session on a fixture with default options.
#[must_use]
pub fn open_fixture(name: &str) -> AllocationSession {
    AllocationSession::open(load_fixture(name), AllocationOptions::default())
}

#[must_use]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_else(|| panic!("Invalid date {y}-{m}-{d}"))
}

#[must_use]
pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

/// The date every built session treats as today.
#[must_use]
pub fn today() -> NaiveDate {
    date(2025, 1, 1)
}

#[must_use]
pub fn item() -> Item {
    Item {
        id: ItemId::new("item"),
        name: "Test item".to_string(),
        doses_per_unit: 1,
        is_vaccine: false,
    }
}

/// A batch of the test item with plenty of shelf life left.
#[must_use]
pub fn stock_line(id: &str, pack_size: u32, available: i64, expiry: NaiveDate) -> StockLine {
    StockLine {
        id: StockLineId::new(id),
        item_id: ItemId::new("item"),
        batch: Some(id.to_string()),
        pack_size,
        available_number_of_packs: dec(available),
        total_number_of_packs: dec(available),
        expiry_date: Some(expiry),
        on_hold: false,
        cost_price_per_pack: Decimal::ZERO,
        sell_price_per_pack: Decimal::ZERO,
        volume_per_pack: Decimal::ZERO,
        location: None,
        vvm_status: None,
    }
}

/// Put a batch in an on-hold location.
#[must_use]
pub fn in_held_location(mut line: StockLine) -> StockLine {
    line.location = Some(Location {
        id: LocationId::new("quarantine"),
        name: "Quarantine".to_string(),
        on_hold: true,
    });
    line
}

/// Session input for a new outbound shipment of the test item.
#[must_use]
pub fn shipment(stock_lines: Vec<StockLine>) -> SessionInput {
    SessionInput {
        invoice_id: InvoiceId::new("invoice"),
        status: InvoiceStatus::New,
        kind: StockOutKind::OutboundShipment,
        item: item(),
        stock_lines,
        saved_lines: Vec::new(),
        today: today(),
        prescribed_quantity: None,
        note: None,
    }
}

/// Units allocated from the line backed by `stock_line_id`.
#[must_use]
pub fn units_from(session: &AllocationSession, stock_line_id: &str) -> Decimal {
    session
        .lines()
        .iter()
        .find(|line| {
            line.stock_line
                .as_ref()
                .is_some_and(|s| s.id.as_str() == stock_line_id)
        })
        .map_or(Decimal::ZERO, stock_allocation_core::DraftStockOutLine::units)
}
