use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Time unit of one return period.
///
/// Canonical user-facing values:
/// - `daily`
/// - `monthly`
/// - `yearly`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Granularity {
    Daily,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// The start date of the period following one that starts at `d`.
    ///
    /// Monthly/yearly steps clamp to the last day of shorter months
    /// (Jan 31 → Feb 28), matching calendar arithmetic everywhere else in
    /// the workspace.
    pub fn step(&self, d: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => d + Days::new(1),
            Granularity::Monthly => d + Months::new(1),
            Granularity::Yearly => d + Months::new(12),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One period's return for one ticker, as produced by a [`ReturnsProvider`].
///
/// `return_pct` is on the 0-100 scale (signed): `2.5` means +2.5 %, never
/// `0.025`. Every percentage in this workspace uses that scale.
///
/// Invariant (provider contract, re-checked by `series::validate`): for a
/// given ticker + granularity, period starts are strictly increasing and
/// contiguous per [`Granularity::step`].
///
/// [`ReturnsProvider`]: crate::provider::ReturnsProvider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReturn {
    pub ticker: String,
    pub period_start: NaiveDate,
    pub granularity: Granularity,
    #[serde(rename = "returnPercentage")]
    pub return_pct: Decimal,
}

impl PeriodReturn {
    pub fn new<S: Into<String>>(
        ticker: S,
        period_start: NaiveDate,
        granularity: Granularity,
        return_pct: Decimal,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            period_start,
            granularity,
            return_pct,
        }
    }

    /// Start date of the period that follows this one.
    pub fn next_period_start(&self) -> NaiveDate {
        self.granularity.step(self.period_start)
    }
}
