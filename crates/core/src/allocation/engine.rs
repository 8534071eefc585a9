//! Greedy, expiry-first distribution of a requested quantity over batches.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::AllocationError;
use crate::types::{
    AllocateIn, DraftStockOutLine, ExpiryPolicy, InvoiceStatus, PackRounding, StockOutKind,
};

/// Knobs for one allocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocateOptions {
    pub allocate_in: AllocateIn,
    pub rounding: PackRounding,
    /// Issue exact fractions of a pack instead of whole packs.
    pub allow_partial_packs: bool,
    pub expiry: ExpiryPolicy,
}

/// Result of [`allocate_quantities`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Every input line, in input order, with its new pack count.
    pub lines: Vec<DraftStockOutLine>,
    /// Quantity that could not be allocated, in units (doses when
    /// allocating in doses). Never negative.
    pub remaining: Decimal,
}

/// Whether shortfall may be parked on the placeholder line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    Allowed,
    Forbidden,
}

impl PlaceholderPolicy {
    /// Only new outbound shipments accept unallocated quantity.
    #[must_use]
    pub const fn for_invoice(status: InvoiceStatus, kind: StockOutKind) -> Self {
        if status.allows_placeholder() && kind.supports_placeholder() {
            Self::Allowed
        } else {
            Self::Forbidden
        }
    }
}

/// Result of [`allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub lines: Vec<DraftStockOutLine>,
    pub placeholder: Option<DraftStockOutLine>,
    /// Units written to the placeholder.
    pub placeholder_quantity: Decimal,
    /// Units that could be neither allocated nor parked on a placeholder.
    pub unmet_quantity: Decimal,
    pub requested_units: Decimal,
    pub allocated_units: Decimal,
}

fn is_eligible(line: &DraftStockOutLine, options: &AllocateOptions) -> bool {
    let pack_size_matches = match options.allocate_in {
        AllocateIn::Packs { pack_size } => line.pack_size == pack_size,
        AllocateIn::Units | AllocateIn::Doses => true,
    };
    !line.is_placeholder()
        && !line.is_on_hold()
        && !line.is_expired(&options.expiry)
        && !line.is_vvm_unusable()
        && line.available_packs > Decimal::ZERO
        && pack_size_matches
}

/// Units (or doses) one pack of the line is worth.
fn factor(line: &DraftStockOutLine, allocate_in: AllocateIn) -> Decimal {
    let pack_size = Decimal::from(line.pack_size);
    match allocate_in {
        AllocateIn::Doses => pack_size * Decimal::from(line.doses_per_unit),
        AllocateIn::Units | AllocateIn::Packs { .. } => pack_size,
    }
}

fn validate(lines: &[DraftStockOutLine], options: &AllocateOptions) -> Result<(), AllocationError> {
    for line in lines.iter().filter(|l| !l.is_placeholder()) {
        if line.pack_size == 0 {
            return Err(AllocationError::MalformedLine {
                line_id: line.id.clone(),
                reason: "pack size must be positive".to_string(),
            });
        }
        if options.allocate_in == AllocateIn::Doses && line.doses_per_unit == 0 {
            return Err(AllocationError::MalformedLine {
                line_id: line.id.clone(),
                reason: "doses per unit must be positive".to_string(),
            });
        }
    }
    Ok(())
}

/// Distribute `requested` over the eligible lines.
///
/// `requested` is in units, doses or packs of the given size, per
/// `options.allocate_in`. Every line starts from zero, so the result only
/// depends on the inputs. Eligible lines are visited earliest expiry first.
///
/// # Errors
///
/// Returns an error if `requested` is negative or a real line has a zero
/// pack size.
#[instrument(level = "debug", skip_all, fields(requested = %requested))]
pub fn allocate_quantities(
    lines: &[DraftStockOutLine],
    requested: Decimal,
    options: &AllocateOptions,
) -> Result<Allocation, AllocationError> {
    if requested < Decimal::ZERO {
        return Err(AllocationError::NegativeQuantity(requested));
    }
    validate(lines, options)?;

    let mut allocated: Vec<DraftStockOutLine> = lines
        .iter()
        .cloned()
        .map(|mut line| {
            line.number_of_packs = Decimal::ZERO;
            line
        })
        .collect();

    let mut eligible: Vec<usize> = allocated
        .iter()
        .enumerate()
        .filter(|(_, line)| is_eligible(line, options))
        .map(|(idx, _)| idx)
        .collect();
    eligible.sort_by_key(|idx| {
        let expiry = allocated.get(*idx).and_then(DraftStockOutLine::expiry_date);
        (expiry.is_none(), expiry)
    });

    let target = match options.allocate_in {
        AllocateIn::Packs { pack_size } => requested * Decimal::from(pack_size),
        AllocateIn::Units | AllocateIn::Doses => requested,
    };

    let remaining = if options.allow_partial_packs {
        fill_partial(&mut allocated, &eligible, target, options.allocate_in)
    } else {
        let remaining = match options.rounding {
            PackRounding::Nearest => {
                fill_nearest(&mut allocated, &eligible, target, options.allocate_in)
            }
            PackRounding::MeetRequested => {
                fill_meet_requested(&mut allocated, &eligible, target, options.allocate_in)
            }
        };
        trim_excess(&mut allocated, &eligible, remaining, options.allocate_in)
    };

    for (line, original) in allocated.iter_mut().zip(lines) {
        line.is_updated = original.is_updated || line.number_of_packs != original.number_of_packs;
    }

    debug!(
        eligible = eligible.len(),
        remaining = %remaining,
        "allocated requested quantity"
    );

    Ok(Allocation {
        lines: allocated,
        remaining: remaining.max(Decimal::ZERO),
    })
}

fn fill_partial(
    lines: &mut [DraftStockOutLine],
    eligible: &[usize],
    target: Decimal,
    allocate_in: AllocateIn,
) -> Decimal {
    let mut remaining = target;
    for idx in eligible {
        if remaining <= Decimal::ZERO {
            break;
        }
        let Some(line) = lines.get_mut(*idx) else {
            continue;
        };
        let factor = factor(line, allocate_in);
        let take = remaining.min(line.available_packs * factor);
        line.number_of_packs = take / factor;
        remaining -= take;
    }
    remaining
}

/// Take whole packs on each line in expiry order without overshooting.
fn fill_whole_packs(
    lines: &mut [DraftStockOutLine],
    eligible: &[usize],
    target: Decimal,
    allocate_in: AllocateIn,
) -> Decimal {
    let mut remaining = target;
    for idx in eligible {
        if remaining <= Decimal::ZERO {
            break;
        }
        let Some(line) = lines.get_mut(*idx) else {
            continue;
        };
        let factor = factor(line, allocate_in);
        let whole_packs = line.available_packs.floor();
        let packs = (remaining.min(whole_packs * factor) / factor).floor();
        line.number_of_packs = packs;
        remaining -= packs * factor;
    }
    remaining
}

fn spare_packs(line: &DraftStockOutLine) -> Decimal {
    line.available_packs.floor() - line.number_of_packs
}

/// Whole packs first, then settle the residual on whichever total lands
/// closest to the target.
///
/// Each line with a spare pack is tried as the one to round up on, with
/// later lines trimmed back. The closest candidate wins over leaving the
/// residual short, and an exact half rounds up.
fn fill_nearest(
    lines: &mut [DraftStockOutLine],
    eligible: &[usize],
    target: Decimal,
    allocate_in: AllocateIn,
) -> Decimal {
    let remaining = fill_whole_packs(lines, eligible, target, allocate_in);
    if remaining <= Decimal::ZERO {
        return remaining;
    }

    let mut best: Option<(Decimal, Vec<DraftStockOutLine>)> = None;
    for idx in eligible {
        let Some(line) = lines.get(*idx) else {
            continue;
        };
        if spare_packs(line) < Decimal::ONE {
            continue;
        }
        let factor = factor(line, allocate_in);
        let mut candidate = lines.to_vec();
        if let Some(line) = candidate.get_mut(*idx) {
            line.number_of_packs += Decimal::ONE;
        }
        let over = -trim_excess(&mut candidate, eligible, remaining - factor, allocate_in);
        if best.as_ref().is_none_or(|(closest, _)| over < *closest) {
            best = Some((over, candidate));
        }
    }

    match best {
        Some((over, candidate)) if over <= remaining => {
            lines.clone_from_slice(&candidate);
            -over
        }
        _ => remaining,
    }
}

fn fill_meet_requested(
    lines: &mut [DraftStockOutLine],
    eligible: &[usize],
    target: Decimal,
    allocate_in: AllocateIn,
) -> Decimal {
    let mut remaining = fill_whole_packs(lines, eligible, target, allocate_in);

    // Whatever is left does not divide into whole packs; round up on the
    // first lines with spare stock.
    for idx in eligible {
        if remaining <= Decimal::ZERO {
            break;
        }
        let Some(line) = lines.get_mut(*idx) else {
            continue;
        };
        let factor = factor(line, allocate_in);
        let spare = spare_packs(line);
        if spare <= Decimal::ZERO {
            continue;
        }
        let extra = (remaining / factor).ceil().min(spare);
        line.number_of_packs += extra;
        remaining -= extra * factor;
    }

    remaining
}

/// Give back whole packs, latest expiry first, while the allocation
/// exceeds the request. Packs larger than the excess are kept.
fn trim_excess(
    lines: &mut [DraftStockOutLine],
    eligible: &[usize],
    remaining: Decimal,
    allocate_in: AllocateIn,
) -> Decimal {
    if remaining >= Decimal::ZERO {
        return remaining;
    }

    let mut excess = -remaining;
    for idx in eligible.iter().rev() {
        if excess.is_zero() {
            break;
        }
        let Some(line) = lines.get_mut(*idx) else {
            continue;
        };
        let factor = factor(line, allocate_in);
        if line.number_of_packs.is_zero() || factor > excess {
            continue;
        }
        let reduce = line.number_of_packs.min((excess / factor).floor());
        line.number_of_packs -= reduce;
        excess -= reduce * factor;
    }
    -excess
}

/// Allocate `requested` and settle the shortfall on the placeholder.
///
/// The shortfall goes to the placeholder when the policy allows it and the
/// session has one. Otherwise the placeholder is zeroed and the shortfall
/// is reported as `unmet_quantity`.
///
/// # Errors
///
/// Propagates [`allocate_quantities`] errors.
#[instrument(level = "debug", skip_all, fields(requested = %requested, ?policy))]
pub fn allocate(
    requested: Decimal,
    options: &AllocateOptions,
    lines: &[DraftStockOutLine],
    placeholder: Option<&DraftStockOutLine>,
    policy: PlaceholderPolicy,
) -> Result<AllocationOutcome, AllocationError> {
    let Allocation { lines, remaining } = allocate_quantities(lines, requested, options)?;

    let doses_per_unit = Decimal::from(
        placeholder
            .or_else(|| lines.first())
            .map_or(1, |line| line.doses_per_unit.max(1)),
    );
    let to_units = |quantity: Decimal| match options.allocate_in {
        AllocateIn::Doses => quantity / doses_per_unit,
        AllocateIn::Packs { pack_size } => quantity * Decimal::from(pack_size),
        AllocateIn::Units => quantity,
    };
    let shortfall = match options.allocate_in {
        AllocateIn::Doses => remaining / doses_per_unit,
        AllocateIn::Units | AllocateIn::Packs { .. } => remaining,
    };

    let placed = policy == PlaceholderPolicy::Allowed && placeholder.is_some();
    let placeholder = placeholder.map(|original| {
        let mut line = original.clone();
        line.number_of_packs = if placed { shortfall } else { Decimal::ZERO };
        line.is_updated = original.is_updated || line.number_of_packs != original.number_of_packs;
        line
    });
    let (placeholder_quantity, unmet_quantity) = if placed {
        (shortfall, Decimal::ZERO)
    } else {
        (Decimal::ZERO, shortfall)
    };

    let allocated_units: Decimal = lines
        .iter()
        .filter(|line| !line.is_placeholder())
        .map(DraftStockOutLine::units)
        .sum();

    if !unmet_quantity.is_zero() {
        debug!(unmet = %unmet_quantity, ?policy, "shortfall not placed on a placeholder");
    }

    Ok(AllocationOutcome {
        lines,
        placeholder,
        placeholder_quantity,
        unmet_quantity,
        requested_units: to_units(requested),
        allocated_units,
    })
}
