use rust_decimal::prelude::ToPrimitive;

use crate::types::BackTest;

/// Why a summary metric could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsError {
    /// The run produced no aggregate ticks.
    EmptyAggregate,
    /// First and last period starts do not span positive time.
    NonPositiveElapsed { days: i64 },
    /// The balance ratio (or growth base) is not positive, so no real
    /// exponent exists.
    NonPositiveGrowth,
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::EmptyAggregate => write!(f, "no aggregate performance to summarize"),
            MetricsError::NonPositiveElapsed { days } => {
                write!(f, "elapsed time must be positive, got {days} days")
            }
            MetricsError::NonPositiveGrowth => {
                write!(f, "growth ratio must be positive")
            }
        }
    }
}

impl std::error::Error for MetricsError {}

const DAYS_PER_YEAR: f64 = 365.25;

impl BackTest {
    /// Compound annual growth rate as a fraction (0.07 = 7% per year).
    ///
    /// `(end / start) ^ (1 / years) − 1`, with years measured between the
    /// first and last period starts. Summary metrics are approximate by
    /// nature (fractional exponents), so this is f64, unlike the exact
    /// decimal balance arithmetic.
    pub fn cagr(&self) -> Result<f64, MetricsError> {
        let first = self
            .aggregate_performance
            .first()
            .ok_or(MetricsError::EmptyAggregate)?;
        let last = self
            .aggregate_performance
            .last()
            .ok_or(MetricsError::EmptyAggregate)?;

        let days = (last.period.period_start - first.period.period_start).num_days();
        if days <= 0 {
            return Err(MetricsError::NonPositiveElapsed { days });
        }

        let start = first.starting_balance.to_f64().unwrap_or(0.0);
        let end = last.ending_balance().to_f64().unwrap_or(0.0);
        if start <= 0.0 || end <= 0.0 {
            return Err(MetricsError::NonPositiveGrowth);
        }

        let years = days as f64 / DAYS_PER_YEAR;
        Ok((end / start).powf(1.0 / years) - 1.0)
    }

    /// Years for the balance to double at this run's CAGR: `ln 2 / ln(1 + r)`.
    ///
    /// A flat or shrinking portfolio never doubles, so a CAGR <= 0 is an
    /// error here even though `cagr` itself reports it fine.
    pub fn years_before_doubling(&self) -> Result<f64, MetricsError> {
        let rate = self.cagr()?;
        let base = 1.0 + rate;
        if base <= 1.0 {
            return Err(MetricsError::NonPositiveGrowth);
        }
        Ok(std::f64::consts::LN_2 / base.ln())
    }
}
