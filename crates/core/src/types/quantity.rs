//! Quantity units, rounding and expiry rules.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The unit a requested quantity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllocateIn {
    /// Individual units (tablets, vials...), spread across any pack size.
    #[default]
    Units,
    /// Doses, for items dispensed per dose (vaccines).
    Doses,
    /// Whole packs of one pack size; lines of other sizes are left alone.
    Packs { pack_size: u32 },
}

/// How a per-line pack count is derived from a unit quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackRounding {
    /// Land as close to the request as whole packs allow, halves rounding
    /// up. Leftover units become shortfall.
    #[default]
    Nearest,
    /// Round up until the request is met, issuing an extra pack when the
    /// remainder does not divide evenly.
    MeetRequested,
}

impl std::str::FromStr for PackRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Self::Nearest),
            "meet_requested" => Ok(Self::MeetRequested),
            _ => Err(format!("invalid pack rounding: {s}")),
        }
    }
}

/// Decides which batches count as expired for allocation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    /// The current date.
    pub today: NaiveDate,
    /// Batches expiring within this many days are treated as expired.
    pub threshold_days: u32,
}

impl ExpiryPolicy {
    #[must_use]
    pub const fn new(today: NaiveDate, threshold_days: u32) -> Self {
        Self {
            today,
            threshold_days,
        }
    }

    /// Whether a batch with this expiry date must not be issued.
    ///
    /// Batches without an expiry date never expire.
    #[must_use]
    pub fn is_expired(&self, expiry_date: Option<NaiveDate>) -> bool {
        let Some(expiry) = expiry_date else {
            return false;
        };
        let cutoff = self
            .today
            .checked_add_days(Days::new(u64::from(self.threshold_days)))
            .unwrap_or(self.today);
        expiry < cutoff
    }
}

/// Coerce raw user input into a requested quantity.
///
/// Anything that is not a non-negative number becomes zero, so the engine
/// only ever sees valid quantities.
#[must_use]
pub fn parse_quantity(input: &str) -> Decimal {
    input
        .trim()
        .parse::<Decimal>()
        .ok()
        .filter(|value| !value.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}
