//! Series validation and window alignment.
//!
//! A return series is only usable by the backtest engine if it is strictly
//! increasing and contiguous per the granularity's calendar step. A gap is a
//! hard error, never in-filled: compounding a missing period as 0% would
//! misstate return.

use chrono::NaiveDate;

use crate::types::{Granularity, PeriodReturn};

// ─── Error ───────────────────────────────────────────────────────────────────

/// Violations of the per-series ordering/contiguity invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// The series contains no periods.
    Empty { ticker: String },
    /// An element carries a different granularity than the series claims.
    MixedGranularity {
        ticker: String,
        expected: Granularity,
        found: Granularity,
    },
    /// Consecutive period starts are not exactly one granularity step apart.
    Gap {
        ticker: String,
        expected: NaiveDate,
        found: NaiveDate,
    },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::Empty { ticker } => write!(f, "empty return series for '{ticker}'"),
            SeriesError::MixedGranularity {
                ticker,
                expected,
                found,
            } => write!(
                f,
                "mixed granularity in series for '{ticker}': expected {expected}, found {found}"
            ),
            SeriesError::Gap {
                ticker,
                expected,
                found,
            } => write!(
                f,
                "non-contiguous series for '{ticker}': expected period start {expected}, found {found}"
            ),
        }
    }
}

impl std::error::Error for SeriesError {}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check that `series` is non-empty, uniformly of `granularity`, and that
/// each period start is exactly one step after the previous one.
pub fn validate(series: &[PeriodReturn], granularity: Granularity) -> Result<(), SeriesError> {
    let first = series.first().ok_or_else(|| SeriesError::Empty {
        ticker: String::new(),
    })?;

    for pr in series {
        if pr.granularity != granularity {
            return Err(SeriesError::MixedGranularity {
                ticker: pr.ticker.clone(),
                expected: granularity,
                found: pr.granularity,
            });
        }
    }

    let mut expected = first.period_start;
    for pr in series {
        if pr.period_start != expected {
            return Err(SeriesError::Gap {
                ticker: pr.ticker.clone(),
                expected,
                found: pr.period_start,
            });
        }
        expected = granularity.step(expected);
    }

    Ok(())
}

// ─── Window alignment ────────────────────────────────────────────────────────

/// Latest of the caller's requested start and each constituent's earliest
/// available period. Constituents begun at different historical depths are
/// aligned by discarding data before this date.
pub fn common_start(
    requested: NaiveDate,
    earliest_starts: impl IntoIterator<Item = NaiveDate>,
) -> NaiveDate {
    earliest_starts.into_iter().fold(requested, NaiveDate::max)
}

/// Drop all periods that start before `start`. Order is preserved.
pub fn truncate_before(series: Vec<PeriodReturn>, start: NaiveDate) -> Vec<PeriodReturn> {
    series
        .into_iter()
        .filter(|pr| pr.period_start >= start)
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
