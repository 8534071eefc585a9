//! Allocation invariants checked over a range of requests.

use rust_decimal::Decimal;
use stock_allocation_core::{
    AlertKind, AllocationOptions, AllocationSession, InvoiceStatus, PackSizeChoice, SessionInput,
    StockOutKind, VvmStatus, VvmStatusId,
};
use stock_allocation_integration_tests::{date, dec, in_held_location, shipment, stock_line};

fn mixed_stock() -> SessionInput {
    shipment(vec![
        stock_line("A", 1, 10, date(2025, 2, 1)),
        stock_line("B", 5, 3, date(2025, 3, 1)),
        stock_line("C", 1, 8, date(2025, 4, 1)),
        in_held_location(stock_line("HELD", 1, 50, date(2025, 1, 15))),
        stock_line("EXPIRED", 1, 50, date(2024, 12, 1)),
    ])
}

fn open(input: SessionInput) -> AllocationSession {
    AllocationSession::open(input, AllocationOptions::default())
}

fn allocation_by_batch(session: &AllocationSession) -> Vec<(String, Decimal)> {
    let mut packs: Vec<(String, Decimal)> = session
        .lines()
        .iter()
        .map(|line| (line.batch().unwrap_or_default().to_string(), line.number_of_packs))
        .collect();
    packs.sort();
    packs
}

// =============================================================================
// Bounds
// =============================================================================

#[test]
fn test_allocation_stays_within_available_whole_packs() {
    for requested in 0..=60 {
        let mut session = open(mixed_stock());
        session.set_quantity(dec(requested)).expect("Should allocate");

        for line in session.lines() {
            assert!(line.number_of_packs >= Decimal::ZERO, "request {requested}");
            assert!(line.number_of_packs <= line.available_packs, "request {requested}");
            assert!(line.number_of_packs.fract().is_zero(), "request {requested}");
        }
    }
}

#[test]
fn test_unusable_stock_is_never_allocated() {
    let mut input = mixed_stock();
    let mut spoiled = stock_line("SPOILED", 1, 50, date(2025, 1, 10));
    spoiled.vvm_status = Some(VvmStatus {
        id: VvmStatusId::new("stage-4"),
        description: "Discard".to_string(),
        unusable: true,
    });
    input.stock_lines.push(spoiled);

    for requested in [1, 10, 40, 100] {
        let mut session = open(input.clone());
        session.set_quantity(dec(requested)).expect("Should allocate");

        for line in session.lines() {
            if matches!(line.batch(), Some("HELD" | "EXPIRED" | "SPOILED")) {
                assert!(line.number_of_packs.is_zero(), "{:?} at {requested}", line.batch());
            }
        }
    }
}

// =============================================================================
// Conservation
// =============================================================================

#[test]
fn test_shortfall_is_placed_or_reported_exactly() {
    for requested in 0..=60 {
        let mut session = open(mixed_stock());
        session.set_quantity(dec(requested)).expect("Should allocate");

        let shortfall = (dec(requested) - session.allocated_units()).max(Decimal::ZERO);
        assert_eq!(
            session.placeholder_units() + session.unmet_units(),
            shortfall,
            "request {requested}"
        );
        assert!(session.unmet_units().is_zero(), "new shipments park shortfall");
    }
}

#[test]
fn test_without_placeholder_shortfall_is_unmet() {
    let mut input = mixed_stock();
    input.kind = StockOutKind::Prescription;
    let mut session = open(input);

    session.set_quantity(dec(60)).expect("Should allocate");

    assert!(session.placeholder().is_none());
    assert_eq!(session.unmet_units(), dec(60) - session.allocated_units());
    assert!(
        session
            .alerts()
            .iter()
            .any(|alert| alert.kind == AlertKind::CannotReachRequested)
    );
}

#[test]
fn test_allocated_shipment_keeps_placeholder_at_zero() {
    let mut input = mixed_stock();
    input.status = InvoiceStatus::Allocated;
    let mut session = open(input);

    session.set_quantity(dec(60)).expect("Should allocate");

    assert_eq!(session.placeholder_units(), dec(0));
    assert!(session.unmet_units() > Decimal::ZERO);
}

// =============================================================================
// Mixed Pack Sizes
// =============================================================================

fn packs_of(session: &AllocationSession, batch: &str) -> Decimal {
    session
        .lines()
        .iter()
        .find(|line| line.batch() == Some(batch))
        .map_or(Decimal::ZERO, |line| line.number_of_packs)
}

#[test]
fn test_large_packs_first_leave_the_rest_to_small_packs() {
    let input = shipment(vec![
        stock_line("TENS", 10, 100, date(2025, 2, 1)),
        stock_line("ONES", 1, 100, date(2025, 3, 1)),
    ]);

    for requested in 0..=60 {
        let mut session = open(input.clone());
        assert_eq!(session.pack_sizes().selected(), PackSizeChoice::Any);
        session.set_quantity(dec(requested)).expect("Should allocate");

        assert_eq!(packs_of(&session, "TENS"), dec(requested / 10), "request {requested}");
        assert_eq!(packs_of(&session, "ONES"), dec(requested % 10), "request {requested}");
        assert_eq!(session.placeholder_units(), dec(0), "request {requested}");
        assert!(session.alerts().is_empty(), "request {requested}");
    }
}

#[test]
fn test_small_packs_first_settle_on_the_closest_total() {
    let input = shipment(vec![
        stock_line("ONES", 1, 5, date(2025, 2, 1)),
        stock_line("TENS", 10, 10, date(2025, 3, 1)),
    ]);

    // (request, ones, tens, placeholder)
    let cases = [
        (3, 3, 0, 0),
        (7, 5, 0, 2),
        (8, 0, 1, 0),
        (12, 2, 1, 0),
        (16, 5, 1, 1),
        (25, 5, 2, 0),
        (33, 3, 3, 0),
    ];
    for (requested, ones, tens, placeholder) in cases {
        let mut session = open(input.clone());
        session.set_quantity(dec(requested)).expect("Should allocate");

        assert_eq!(packs_of(&session, "ONES"), dec(ones), "request {requested}");
        assert_eq!(packs_of(&session, "TENS"), dec(tens), "request {requested}");
        assert_eq!(session.placeholder_units(), dec(placeholder), "request {requested}");
    }

    for requested in 0..=100 {
        let mut session = open(input.clone());
        session.set_quantity(dec(requested)).expect("Should allocate");

        let total = session.allocated_units() + session.placeholder_units();
        assert!(total >= dec(requested), "request {requested}");
        assert!(total - dec(requested) <= dec(5), "request {requested}");
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_later_batches_wait_for_earlier_ones() {
    let input = shipment(vec![
        stock_line("LATE", 1, 10, date(2025, 9, 1)),
        stock_line("EARLY", 1, 10, date(2025, 2, 1)),
        stock_line("MIDDLE", 1, 10, date(2025, 5, 1)),
    ]);

    for requested in 0..=30 {
        let mut session = open(input.clone());
        session.set_quantity(dec(requested)).expect("Should allocate");

        let mut by_expiry: Vec<_> = session.lines().iter().collect();
        by_expiry.sort_by_key(|line| line.expiry_date());
        for pair in by_expiry.windows(2) {
            if let [earlier, later] = pair {
                if later.number_of_packs > Decimal::ZERO {
                    assert_eq!(
                        earlier.number_of_packs, earlier.available_packs,
                        "request {requested}"
                    );
                }
            }
        }
    }
}

// =============================================================================
// Recompute
// =============================================================================

#[test]
fn test_same_input_gives_same_allocation() {
    for requested in [0, 7, 13, 26, 45] {
        let mut first = open(mixed_stock());
        let mut second = open(mixed_stock());
        first.set_quantity(dec(requested)).expect("Should allocate");
        second.set_quantity(dec(requested)).expect("Should allocate");

        assert_eq!(allocation_by_batch(&first), allocation_by_batch(&second));
        assert_eq!(first.placeholder_units(), second.placeholder_units());
    }
}

#[test]
fn test_result_does_not_depend_on_previous_requests() {
    let mut fresh = open(mixed_stock());
    fresh.set_quantity(dec(12)).expect("Should allocate");

    let mut edited = open(mixed_stock());
    for requested in [40, 3, 25] {
        edited.set_quantity(dec(requested)).expect("Should allocate");
    }
    edited.set_quantity(dec(12)).expect("Should allocate");

    assert_eq!(allocation_by_batch(&fresh), allocation_by_batch(&edited));
    assert_eq!(fresh.placeholder_units(), edited.placeholder_units());
}

#[test]
fn test_zero_request_clears_everything() {
    let mut session = open(mixed_stock());
    session.set_quantity(dec(15)).expect("Should allocate");

    session.set_quantity(dec(0)).expect("Should clear");
    assert_eq!(session.allocated_units(), dec(0));
    assert_eq!(session.placeholder_units(), dec(0));
    let kinds: Vec<_> = session.alerts().iter().map(|alert| alert.kind).collect();
    assert_eq!(kinds, vec![AlertKind::ConfirmZeroQuantity]);

    let cleared = allocation_by_batch(&session);
    session.set_quantity(dec(0)).expect("Should clear again");
    assert_eq!(allocation_by_batch(&session), cleared);
    assert!(session.alerts().is_empty());
}
