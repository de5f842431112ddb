use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fbk_projection::Tick;
use fbk_rebalance::{RebalanceEvent, RebalanceStrategy};
use fbk_returns::Granularity;

/// Ticker label carried by aggregate (portfolio-level) ticks.
pub const PORTFOLIO_TICKER: &str = "PORTFOLIO";

/// One constituent's share of the portfolio.
///
/// `percentage` is a target weight on the 0-100 scale. Duplicate tickers are
/// allowed; the engine sums them into one effective weight per distinct
/// ticker. The engine does not force weights to sum to 100, but downstream
/// semantics assume they do for a coherent backtest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub ticker: String,
    pub percentage: Decimal,
}

impl Allocation {
    pub fn new<S: Into<String>>(ticker: S, percentage: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            percentage,
        }
    }
}

/// Everything one backtest run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub allocations: Vec<Allocation>,
    pub starting_balance: Decimal,
    pub granularity: Granularity,
    /// Inclusive first period start. Constituents whose history begins later
    /// pull the whole portfolio's start forward (date alignment).
    pub first_period: NaiveDate,
    /// Inclusive last period start.
    pub last_period: NaiveDate,
    pub rebalance_strategy: RebalanceStrategy,
    /// Band width, 0-100 scale. Required by the band strategies, ignored by
    /// the rest.
    pub rebalance_threshold: Option<Decimal>,
}

/// The immutable result of one backtest run.
///
/// The aggregate sequence is the per-period sum of all constituents'
/// balances; decomposed sequences and rebalance logs are keyed by the same
/// distinct tickers as the (grouped) input allocations. Summary metrics are
/// methods, not fields — see `cagr` and `years_before_doubling`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackTest {
    pub aggregate_performance: Vec<Tick>,
    #[serde(rename = "decomposedPerformanceByTicker")]
    pub decomposed_performance: BTreeMap<String, Vec<Tick>>,
    #[serde(rename = "rebalancesByTicker")]
    pub rebalances: BTreeMap<String, Vec<RebalanceEvent>>,
    pub rebalance_strategy: RebalanceStrategy,
    pub rebalance_threshold: Option<Decimal>,
}

impl BackTest {
    /// Ending balance of the last aggregate period.
    pub fn final_balance(&self) -> Option<Decimal> {
        self.aggregate_performance
            .last()
            .map(|t| t.ending_balance())
    }

    /// Whole-run return, 0-100 scale.
    pub fn total_return_pct(&self) -> Option<Decimal> {
        let first = self.aggregate_performance.first()?;
        let last = self.aggregate_performance.last()?;
        if first.starting_balance.is_zero() {
            return None;
        }
        Some(
            (last.ending_balance() - first.starting_balance) / first.starting_balance
                * Decimal::ONE_HUNDRED,
        )
    }
}
