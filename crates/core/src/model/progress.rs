use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{EntryId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PercentError {
    #[error("progress percent must be within 0..=100, got {0}")]
    OutOfRange(i64),
}

//
// ─── PERCENT ───────────────────────────────────────────────────────────────────
//

/// Completion percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(100);

    /// Validated constructor.
    ///
    /// # Errors
    ///
    /// Returns `PercentError::OutOfRange` for values outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, PercentError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(PercentError::OutOfRange(value))
    }

    /// Clamp any integer into range.
    #[must_use]
    pub fn saturating(value: i64) -> Self {
        Self(u8::try_from(value.clamp(0, 100)).unwrap_or(100))
    }

    /// Parse a stored numeric value, truncating fractions the way `parseInt` does.
    ///
    /// # Errors
    ///
    /// Returns `PercentError::OutOfRange` if the truncated value is outside `0..=100`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_stored(value: f64) -> Result<Self, PercentError> {
        if !value.is_finite() {
            return Err(PercentError::OutOfRange(i64::MIN));
        }
        Self::new(value.trunc() as i64)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percent {
    type Error = PercentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Parent percentage from its children.
///
/// `siblings` are the stored values of every child except the one that just
/// changed, `updated` is that child's new value and `child_count` includes it.
/// Computes `round((Σ siblings + updated) / (child_count × 100) × 100)` in
/// `f64`, so values whose quotient lands just under .5 round down (29 of 2 is
/// 14, not 15). The result is clamped to 100 so stale duplicate sibling rows
/// cannot push it out of range.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn roll_up(
    siblings: impl IntoIterator<Item = Percent>,
    updated: Percent,
    child_count: usize,
) -> Percent {
    if child_count == 0 {
        return updated;
    }
    let sum: u64 = siblings
        .into_iter()
        .map(|p| u64::from(p.value()))
        .sum::<u64>()
        + u64::from(updated.value());
    let max = child_count as f64 * 100.0;
    let ratio = (sum as f64 / max) * 100.0;
    Percent::saturating(ratio.round() as i64)
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Stored completion of one entry for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: EntryId,
    pub user_id: UserId,
    pub entry_id: EntryId,
    pub percent: Percent,
}

/// Progress record about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgressRecord {
    pub api_name: String,
    pub name: String,
    pub entry_id: EntryId,
    pub percent: Percent,
}

impl NewProgressRecord {
    /// Record for `entry_id` named with the given uniqueness suffix.
    #[must_use]
    pub fn with_suffix(entry_id: EntryId, percent: Percent, suffix: &str) -> Self {
        Self {
            api_name: format!("api_record_{entry_id}_{suffix}"),
            name: format!("record_{entry_id}_{suffix}"),
            entry_id,
            percent,
        }
    }
}
