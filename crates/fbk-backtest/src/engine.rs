use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use fbk_projection::{Projector, Tick};
use fbk_rebalance::{
    reset_to_targets, PolicyAction, PolicyError, RebalanceEvent, RebalancePolicy,
    RebalanceStrategy,
};
use fbk_returns::{
    series, Granularity, PeriodReturn, ProviderError, ReturnsProvider, ReturnsRequest,
    SeriesError,
};

use crate::types::{Allocation, BackTest, BacktestRequest, PORTFOLIO_TICKER};

/// Backtest error variants.
///
/// The first three are input errors, rejected before any fetch. The rest
/// surface provider/series failures; none is retried or defaulted by the
/// engine, and no partial result is ever returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktestError {
    /// The allocation set is empty.
    EmptyAllocations,
    /// Starting balance must be > 0.
    NonPositiveStartingBalance { balance: Decimal },
    /// A band strategy was configured without a threshold.
    MissingThreshold { strategy: RebalanceStrategy },
    /// No return history exists for this ticker/granularity.
    NotFound {
        ticker: String,
        granularity: Granularity,
    },
    /// A constituent's series does not share the portfolio's period
    /// timeline. Compounding a missing period as 0% would misstate return,
    /// so this is fatal.
    SeriesMisaligned {
        ticker: String,
        /// Period start the timeline required, if one was expected.
        expected: Option<NaiveDate>,
        /// Period start the series supplied instead, if any.
        found: Option<NaiveDate>,
    },
    /// The provider failed for a reason other than missing history.
    Provider { ticker: String, source: ProviderError },
}

impl std::fmt::Display for BacktestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BacktestError::EmptyAllocations => {
                write!(f, "allocation set must not be empty")
            }
            BacktestError::NonPositiveStartingBalance { balance } => {
                write!(f, "starting balance must be > 0, got {balance}")
            }
            BacktestError::MissingThreshold { strategy } => {
                write!(f, "strategy '{strategy}' requires a rebalance threshold")
            }
            BacktestError::NotFound {
                ticker,
                granularity,
            } => {
                write!(f, "no {granularity} return history for ticker '{ticker}'")
            }
            BacktestError::SeriesMisaligned {
                ticker,
                expected,
                found,
            } => match (expected, found) {
                (Some(e), Some(g)) => write!(
                    f,
                    "series for '{ticker}' misaligned: expected period start {e}, found {g}"
                ),
                (Some(e), None) => write!(
                    f,
                    "series for '{ticker}' misaligned: ends before required period start {e}"
                ),
                (None, Some(g)) => write!(
                    f,
                    "series for '{ticker}' misaligned: extra period start {g} past the timeline"
                ),
                (None, None) => write!(f, "series for '{ticker}' misaligned"),
            },
            BacktestError::Provider { ticker, source } => {
                write!(f, "provider failure for '{ticker}': {source}")
            }
        }
    }
}

impl std::error::Error for BacktestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BacktestError::Provider { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The backtest engine: a pure computation over an injected return-history
/// provider. Holds no per-run state; one engine may serve many concurrent
/// runs.
pub struct BacktestEngine {
    provider: Arc<dyn ReturnsProvider>,
}

impl BacktestEngine {
    pub fn new(provider: Arc<dyn ReturnsProvider>) -> Self {
        Self { provider }
    }

    /// Run one backtest.
    ///
    /// Pipeline:
    /// 1. Validate inputs; group duplicate allocations into one effective
    ///    target weight per distinct ticker.
    /// 2. Fetch every constituent's return series (all series are gathered
    ///    before any advancement — this loop is the join point).
    /// 3. Align: common start = latest of the requested start and each
    ///    series' earliest period; truncate; verify identical timelines.
    /// 4. Seed per-constituent projectors with `balance × weight / 100`.
    /// 5. Advance all constituents one period at a time in lockstep; after
    ///    each interior boundary, consult the rebalance policy and reseed
    ///    the next period's starting balances when it fires.
    /// 6. Assemble the `BackTest`.
    pub fn run(&self, req: &BacktestRequest) -> Result<BackTest, BacktestError> {
        // 1. Validate + group.
        if req.starting_balance <= Decimal::ZERO {
            return Err(BacktestError::NonPositiveStartingBalance {
                balance: req.starting_balance,
            });
        }
        if req.rebalance_strategy.requires_threshold() && req.rebalance_threshold.is_none() {
            return Err(BacktestError::MissingThreshold {
                strategy: req.rebalance_strategy,
            });
        }
        let targets = group_allocations(&req.allocations)?;

        // 2. Fetch all series. BTreeMap keys give a deterministic fetch
        // order; the provider may be shared across threads but each run
        // waits for its own complete set here.
        let mut fetched: BTreeMap<String, Vec<PeriodReturn>> = BTreeMap::new();
        for ticker in targets.keys() {
            let fetch_req = ReturnsRequest::new(
                ticker.clone(),
                req.granularity,
                req.first_period,
                req.last_period,
            );
            let series = self
                .provider
                .fetch_returns(&fetch_req)
                .map_err(|e| match e {
                    ProviderError::NotFound {
                        ticker,
                        granularity,
                    } => BacktestError::NotFound {
                        ticker,
                        granularity,
                    },
                    other => BacktestError::Provider {
                        ticker: ticker.clone(),
                        source: other,
                    },
                })?;
            if series.is_empty() {
                return Err(BacktestError::NotFound {
                    ticker: ticker.clone(),
                    granularity: req.granularity,
                });
            }
            series::validate(&series, req.granularity)
                .map_err(|e| misaligned_from_series_error(ticker, e))?;
            debug!(
                provider = self.provider.name(),
                ticker = %ticker,
                periods = series.len(),
                "fetched return series"
            );
            fetched.insert(ticker.clone(), series);
        }

        // 3. Align timelines.
        let start = series::common_start(
            req.first_period,
            fetched.values().filter_map(|s| s.first().map(|p| p.period_start)),
        );
        let aligned = align_series(fetched, start)?;

        // First (alphabetical) constituent's timeline is the portfolio
        // timeline; align_series proved the rest are identical.
        let timeline: Vec<NaiveDate> = match aligned.values().next() {
            Some(s) => s.iter().map(|p| p.period_start).collect(),
            None => Vec::new(),
        };
        let periods = timeline.len();

        // 4. Seed projectors.
        let mut projectors: BTreeMap<String, Projector> = targets
            .iter()
            .map(|(ticker, pct)| {
                let seed = req.starting_balance * *pct / Decimal::ONE_HUNDRED;
                (ticker.clone(), Projector::new(seed))
            })
            .collect();

        // Unreachable in practice: every series is non-empty after alignment.
        let Some(&anchor) = timeline.first() else {
            return Ok(empty_result(req, &targets));
        };
        let mut policy =
            RebalancePolicy::new(req.rebalance_strategy, req.rebalance_threshold, anchor)
                .map_err(|PolicyError::MissingThreshold { strategy }| {
                    BacktestError::MissingThreshold { strategy }
                })?;

        // 5. Lockstep advancement.
        let mut decomposed: BTreeMap<String, Vec<Tick>> = targets
            .keys()
            .map(|t| (t.clone(), Vec::with_capacity(periods)))
            .collect();
        let mut rebalances: BTreeMap<String, Vec<RebalanceEvent>> =
            targets.keys().map(|t| (t.clone(), Vec::new())).collect();
        let mut aggregate: Vec<Tick> = Vec::with_capacity(periods);

        for i in 0..periods {
            let mut sum_start = Decimal::ZERO;
            let mut sum_end = Decimal::ZERO;

            for (ticker, projector) in &mut projectors {
                // Indexing is safe: align_series proved equal lengths.
                let period = &aligned[ticker][i];
                let tick = projector.advance(period);
                sum_start += tick.starting_balance;
                sum_end += tick.ending_balance();
                if let Some(seq) = decomposed.get_mut(ticker) {
                    seq.push(tick);
                }
            }

            let portfolio_return = if sum_start.is_zero() {
                Decimal::ZERO
            } else {
                (sum_end - sum_start) / sum_start * Decimal::ONE_HUNDRED
            };
            aggregate.push(Tick::new(
                PeriodReturn::new(
                    PORTFOLIO_TICKER,
                    timeline[i],
                    req.granularity,
                    portfolio_return,
                ),
                sum_start,
            ));

            // After the period closes, the policy decides whether the next
            // period opens rebalanced. The final period has no next period
            // to reseed, so no boundary is evaluated there.
            if i + 1 < periods {
                let balances: BTreeMap<String, Decimal> = projectors
                    .iter()
                    .map(|(t, p)| (t.clone(), p.balance()))
                    .collect();

                if policy.evaluate(timeline[i + 1], &balances, &targets)
                    == PolicyAction::Rebalance
                {
                    let reset = reset_to_targets(&balances, &targets);
                    for (ticker, projector) in &mut projectors {
                        let Some(&after) = reset.get(ticker) else {
                            continue;
                        };
                        let before = projector.balance();
                        if let Some(log) = rebalances.get_mut(ticker) {
                            log.push(RebalanceEvent {
                                ticker: ticker.clone(),
                                period_start: timeline[i],
                                granularity: req.granularity,
                                balance_before: before,
                                balance_after: after,
                            });
                        }
                        projector.rebase(after);
                    }
                    policy.settle();
                    info!(
                        strategy = %req.rebalance_strategy,
                        period_start = %timeline[i],
                        "rebalanced to target allocations"
                    );
                }
            }
        }

        // 6. Assemble.
        Ok(assemble(req, decomposed, rebalances, aggregate))
    }
}

fn assemble(
    req: &BacktestRequest,
    decomposed: BTreeMap<String, Vec<Tick>>,
    rebalances: BTreeMap<String, Vec<RebalanceEvent>>,
    aggregate: Vec<Tick>,
) -> BackTest {
    BackTest {
        aggregate_performance: aggregate,
        decomposed_performance: decomposed,
        rebalances,
        rebalance_strategy: req.rebalance_strategy,
        rebalance_threshold: req.rebalance_threshold,
    }
}

/// Result of a run with no periods. Keeps the shape of every reachable
/// result: one (empty) sequence per distinct ticker, never a keyless map.
fn empty_result(req: &BacktestRequest, targets: &BTreeMap<String, Decimal>) -> BackTest {
    assemble(
        req,
        targets.keys().map(|t| (t.clone(), Vec::new())).collect(),
        targets.keys().map(|t| (t.clone(), Vec::new())).collect(),
        Vec::new(),
    )
}

/// Group duplicate tickers into one effective target weight each.
fn group_allocations(
    allocations: &[Allocation],
) -> Result<BTreeMap<String, Decimal>, BacktestError> {
    if allocations.is_empty() {
        return Err(BacktestError::EmptyAllocations);
    }
    let mut targets: BTreeMap<String, Decimal> = BTreeMap::new();
    for a in allocations {
        *targets.entry(a.ticker.clone()).or_insert(Decimal::ZERO) += a.percentage;
    }
    Ok(targets)
}

/// Truncate every series to the common start and verify they share one
/// period timeline.
fn align_series(
    fetched: BTreeMap<String, Vec<PeriodReturn>>,
    start: NaiveDate,
) -> Result<BTreeMap<String, Vec<PeriodReturn>>, BacktestError> {
    let mut aligned: BTreeMap<String, Vec<PeriodReturn>> = BTreeMap::new();
    for (ticker, series) in fetched {
        let truncated = series::truncate_before(series, start);
        if truncated.is_empty() {
            // This series ends before another constituent's history begins.
            return Err(BacktestError::SeriesMisaligned {
                ticker,
                expected: Some(start),
                found: None,
            });
        }
        aligned.insert(ticker, truncated);
    }

    let mut iter = aligned.iter();
    let Some((_, reference)) = iter.next() else {
        return Ok(aligned);
    };
    for (ticker, series) in iter {
        for i in 0..reference.len().max(series.len()) {
            let expected = reference.get(i).map(|p| p.period_start);
            let found = series.get(i).map(|p| p.period_start);
            if expected != found {
                return Err(BacktestError::SeriesMisaligned {
                    ticker: ticker.clone(),
                    expected,
                    found,
                });
            }
        }
    }
    Ok(aligned)
}

fn misaligned_from_series_error(ticker: &str, err: SeriesError) -> BacktestError {
    match err {
        SeriesError::Gap {
            ticker,
            expected,
            found,
        } => BacktestError::SeriesMisaligned {
            ticker,
            expected: Some(expected),
            found: Some(found),
        },
        SeriesError::Empty { .. } | SeriesError::MixedGranularity { .. } => {
            BacktestError::SeriesMisaligned {
                ticker: ticker.to_string(),
                expected: None,
                found: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(ticker: &str, starts: &[(i32, u32)]) -> Vec<PeriodReturn> {
        starts
            .iter()
            .map(|&(y, m)| PeriodReturn::new(ticker, d(y, m, 1), Granularity::Monthly, dec!(1)))
            .collect()
    }

    // ── group_allocations ────────────────────────────────────────────────────

    #[test]
    fn empty_allocations_rejected() {
        assert_eq!(
            group_allocations(&[]).unwrap_err(),
            BacktestError::EmptyAllocations
        );
    }

    #[test]
    fn duplicate_tickers_sum_into_one_weight() {
        let grouped = group_allocations(&[
            Allocation::new("#2X", dec!(50)),
            Allocation::new("#2X", dec!(30)),
            Allocation::new("#1X", dec!(20)),
        ])
        .unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["#2X"], dec!(80));
        assert_eq!(grouped["#1X"], dec!(20));
    }

    // ── align_series ─────────────────────────────────────────────────────────

    #[test]
    fn align_truncates_deeper_history_to_common_start() {
        let mut fetched = BTreeMap::new();
        fetched.insert(
            "#1X".to_string(),
            monthly("#1X", &[(2022, 11), (2022, 12), (2023, 1), (2023, 2)]),
        );
        fetched.insert("#3X".to_string(), monthly("#3X", &[(2023, 1), (2023, 2)]));

        let aligned = align_series(fetched, d(2023, 1, 1)).unwrap();
        assert_eq!(aligned["#1X"].len(), 2);
        assert_eq!(aligned["#1X"][0].period_start, d(2023, 1, 1));
    }

    #[test]
    fn mismatched_timestamps_are_misaligned() {
        let mut fetched = BTreeMap::new();
        fetched.insert("#1X".to_string(), monthly("#1X", &[(2023, 1), (2023, 2)]));
        fetched.insert("#3X".to_string(), monthly("#3X", &[(2023, 2), (2023, 3)]));

        let err = align_series(fetched, d(2023, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            BacktestError::SeriesMisaligned {
                ticker: "#3X".to_string(),
                expected: Some(d(2023, 1, 1)),
                found: Some(d(2023, 2, 1)),
            }
        );
    }

    #[test]
    fn shorter_series_is_misaligned() {
        let mut fetched = BTreeMap::new();
        fetched.insert(
            "#1X".to_string(),
            monthly("#1X", &[(2023, 1), (2023, 2), (2023, 3)]),
        );
        fetched.insert("#3X".to_string(), monthly("#3X", &[(2023, 1), (2023, 2)]));

        let err = align_series(fetched, d(2023, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            BacktestError::SeriesMisaligned {
                ticker: "#3X".to_string(),
                expected: Some(d(2023, 3, 1)),
                found: None,
            }
        );
    }

    #[test]
    fn series_ending_before_common_start_is_misaligned() {
        let mut fetched = BTreeMap::new();
        fetched.insert("#1X".to_string(), monthly("#1X", &[(2022, 1), (2022, 2)]));

        let err = align_series(fetched, d(2023, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::SeriesMisaligned {
                found: None,
                ..
            }
        ));
    }

    // ── empty_result ─────────────────────────────────────────────────────────

    #[test]
    fn empty_result_is_keyed_per_ticker() {
        let req = BacktestRequest {
            allocations: vec![
                Allocation::new("#1X", dec!(50)),
                Allocation::new("#3X", dec!(50)),
            ],
            starting_balance: dec!(100),
            granularity: Granularity::Monthly,
            first_period: d(2023, 1, 1),
            last_period: d(2023, 6, 1),
            rebalance_strategy: RebalanceStrategy::None,
            rebalance_threshold: None,
        };
        let targets = group_allocations(&req.allocations).unwrap();

        let result = empty_result(&req, &targets);
        assert!(result.aggregate_performance.is_empty());
        for ticker in ["#1X", "#3X"] {
            assert!(result.decomposed_performance[ticker].is_empty());
            assert!(result.rebalances[ticker].is_empty());
        }
        assert_eq!(result.decomposed_performance.len(), 2);
        assert_eq!(result.rebalances.len(), 2);
    }

    // ── Error display ────────────────────────────────────────────────────────

    #[test]
    fn error_display_is_descriptive() {
        assert!(!BacktestError::EmptyAllocations.to_string().is_empty());
        assert!(BacktestError::NonPositiveStartingBalance { balance: dec!(0) }
            .to_string()
            .contains("> 0"));
        assert!(BacktestError::MissingThreshold {
            strategy: RebalanceStrategy::BandsAbsolute
        }
        .to_string()
        .contains("threshold"));
        assert!(BacktestError::NotFound {
            ticker: "#9X".to_string(),
            granularity: Granularity::Daily,
        }
        .to_string()
        .contains("#9X"));
    }
}
