//! fbk-testkit
//!
//! Deterministic test fixtures for the backtest workspace: an in-memory
//! [`ReturnsProvider`] with preloaded series, plus builders for contiguous
//! return series. Test-only; nothing here belongs in production wiring.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use fbk_returns::{Granularity, PeriodReturn, ProviderError, ReturnsProvider, ReturnsRequest};

// ─── Fixed provider ──────────────────────────────────────────────────────────

/// In-memory provider with preloaded series, keyed by ticker + granularity.
///
/// `fetch_returns` serves the stored series narrowed to the requested window
/// and answers `NotFound` for any ticker it was not loaded with. Identical
/// requests always get identical answers, so engine runs against it are
/// reproducible.
#[derive(Debug, Default)]
pub struct FixedReturnsProvider {
    series: BTreeMap<(String, Granularity), Vec<PeriodReturn>>,
}

impl FixedReturnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one series; chains for fluent fixture setup.
    pub fn with_series(mut self, series: Vec<PeriodReturn>) -> Self {
        self.load(series);
        self
    }

    /// Load one series in place. Empty input is ignored (an unloaded ticker
    /// already answers `NotFound`).
    pub fn load(&mut self, series: Vec<PeriodReturn>) {
        let Some(first) = series.first() else {
            return;
        };
        let key = (first.ticker.clone(), first.granularity);
        self.series.insert(key, series);
    }
}

impl ReturnsProvider for FixedReturnsProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn fetch_returns(&self, req: &ReturnsRequest) -> Result<Vec<PeriodReturn>, ProviderError> {
        let key = (req.ticker.clone(), req.granularity);
        let Some(series) = self.series.get(&key) else {
            return Err(ProviderError::NotFound {
                ticker: req.ticker.clone(),
                granularity: req.granularity,
            });
        };
        Ok(series
            .iter()
            .filter(|p| p.period_start >= req.start && p.period_start <= req.end)
            .cloned()
            .collect())
    }
}

// ─── Series builders ─────────────────────────────────────────────────────────

/// A contiguous series with one return per listed percentage, starting at
/// `start` and stepping by the granularity's calendar step.
pub fn series_of(
    ticker: &str,
    granularity: Granularity,
    start: NaiveDate,
    returns: &[Decimal],
) -> Vec<PeriodReturn> {
    let mut period_start = start;
    returns
        .iter()
        .map(|&pct| {
            let pr = PeriodReturn::new(ticker, period_start, granularity, pct);
            period_start = granularity.step(period_start);
            pr
        })
        .collect()
}

/// `periods` consecutive periods, every one returning `pct`.
pub fn flat_series(
    ticker: &str,
    granularity: Granularity,
    start: NaiveDate,
    periods: usize,
    pct: Decimal,
) -> Vec<PeriodReturn> {
    series_of(ticker, granularity, start, &vec![pct; periods])
}

// ─── Tests ───────────────────────────────────────────────────────────────────
