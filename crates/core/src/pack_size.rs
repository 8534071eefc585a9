//! Tracks the pack size the user is allocating in.
//!
//! The options are the distinct pack sizes of the batches that can actually
//! be issued. When the item is stocked in several pack sizes an `Any`
//! option (wire value `-1`) lets the user allocate in units across all of
//! them.

use serde::{Deserialize, Serialize};

use crate::types::{DraftStockOutLine, ExpiryPolicy};

/// A pack-size selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PackSizeChoice {
    /// Allocate in units across every pack size.
    Any,
    /// Allocate in packs of exactly this size.
    Size(u32),
}

impl PackSizeChoice {
    /// Sentinel used for `Any` on the wire.
    pub const ANY_VALUE: i64 = -1;

    /// Whether a line of `pack_size` may be allocated under this selection.
    #[must_use]
    pub const fn accepts(self, pack_size: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Size(size) => size == pack_size,
        }
    }
}

impl From<PackSizeChoice> for i64 {
    fn from(choice: PackSizeChoice) -> Self {
        match choice {
            PackSizeChoice::Any => PackSizeChoice::ANY_VALUE,
            PackSizeChoice::Size(size) => Self::from(size),
        }
    }
}

impl TryFrom<i64> for PackSizeChoice {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == Self::ANY_VALUE {
            return Ok(Self::Any);
        }
        u32::try_from(value)
            .ok()
            .filter(|size| *size > 0)
            .map(Self::Size)
            .ok_or_else(|| format!("invalid pack size: {value}"))
    }
}

impl std::fmt::Display for PackSizeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Size(size) => write!(f, "{size}"),
        }
    }
}

impl std::str::FromStr for PackSizeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }
        let value = s
            .parse::<i64>()
            .map_err(|_| format!("invalid pack size: {s}"))?;
        Self::try_from(value)
    }
}

/// One entry of the pack-size dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSizeOption {
    pub choice: PackSizeChoice,
    pub label: String,
}

impl PackSizeOption {
    fn new(choice: PackSizeChoice) -> Self {
        let label = match choice {
            PackSizeChoice::Any => "Any".to_string(),
            PackSizeChoice::Size(size) => size.to_string(),
        };
        Self { choice, label }
    }
}

/// Pack-size options and selection for one editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSizeController {
    options: Vec<PackSizeOption>,
    selected: PackSizeChoice,
}

impl PackSizeController {
    /// Build the options from the session's draft lines and pick the
    /// initial selection.
    #[must_use]
    pub fn new(lines: &[DraftStockOutLine], expiry: &ExpiryPolicy) -> Self {
        Self {
            options: options(lines, expiry),
            selected: initial_selection(lines, expiry),
        }
    }

    #[must_use]
    pub fn options(&self) -> &[PackSizeOption] {
        &self.options
    }

    #[must_use]
    pub const fn selected(&self) -> PackSizeChoice {
        self.selected
    }

    #[must_use]
    pub fn is_offered(&self, choice: PackSizeChoice) -> bool {
        self.options.iter().any(|option| option.choice == choice)
    }

    /// Select a pack size. Values that are not offered are ignored.
    ///
    /// Returns whether the selection changed.
    pub fn set_pack_size(&mut self, choice: PackSizeChoice) -> bool {
        if !self.is_offered(choice) || self.selected == choice {
            return false;
        }
        self.selected = choice;
        true
    }

    /// Recompute the options after the candidate lines changed.
    pub fn refresh(&mut self, lines: &[DraftStockOutLine], expiry: &ExpiryPolicy) {
        self.options = options(lines, expiry);
        if !self.is_offered(self.selected) {
            self.selected = initial_selection(lines, expiry);
        }
    }
}

fn is_valid(line: &DraftStockOutLine, expiry: &ExpiryPolicy) -> bool {
    !line.is_placeholder()
        && !line.is_expired(expiry)
        && !line.is_on_hold()
        && line.available_packs > rust_decimal::Decimal::ZERO
}

fn distinct_sizes<'a>(lines: impl Iterator<Item = &'a DraftStockOutLine>) -> Vec<u32> {
    let mut sizes: Vec<u32> = lines.map(|line| line.pack_size).collect();
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

fn options(lines: &[DraftStockOutLine], expiry: &ExpiryPolicy) -> Vec<PackSizeOption> {
    let real_sizes = distinct_sizes(lines.iter().filter(|l| !l.is_placeholder()));
    if real_sizes.is_empty() {
        return Vec::new();
    }

    let valid_sizes = distinct_sizes(lines.iter().filter(|l| is_valid(l, expiry)));
    let mut options = Vec::with_capacity(valid_sizes.len() + 1);
    if real_sizes.len() > 1 || valid_sizes.is_empty() {
        options.push(PackSizeOption::new(PackSizeChoice::Any));
    }
    options.extend(
        valid_sizes
            .into_iter()
            .map(|size| PackSizeOption::new(PackSizeChoice::Size(size))),
    );
    options
}

fn initial_selection(lines: &[DraftStockOutLine], expiry: &ExpiryPolicy) -> PackSizeChoice {
    let has_real_lines = lines.iter().any(|l| !l.is_placeholder());
    if !has_real_lines {
        return PackSizeChoice::Size(1);
    }

    let allocated_sizes = distinct_sizes(
        lines
            .iter()
            .filter(|l| !l.is_placeholder() && !l.number_of_packs.is_zero()),
    );
    match allocated_sizes.as_slice() {
        [size] => return PackSizeChoice::Size(*size),
        [] => {}
        _ => return PackSizeChoice::Any,
    }

    let placeholder_allocated = lines
        .iter()
        .any(|l| l.is_placeholder() && !l.number_of_packs.is_zero());
    if placeholder_allocated {
        return PackSizeChoice::Any;
    }

    match distinct_sizes(lines.iter().filter(|l| is_valid(l, expiry))).as_slice() {
        [size] => PackSizeChoice::Size(*size),
        _ => PackSizeChoice::Any,
    }
}
