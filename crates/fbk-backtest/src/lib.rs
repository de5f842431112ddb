//! fbk-backtest
//!
//! Backtest engine: allocations + starting balance + granularity + rebalance
//! policy → one portfolio-level trajectory, per-ticker decomposed
//! trajectories, and a rebalance-event log.
//!
//! Pipeline per run: VALIDATE -> FETCH -> ALIGN -> LOCKSTEP -> ASSEMBLE
//!
//! - Deterministic (same request + provider data => identical results)
//! - All constituents advance one period at a time in lockstep; the
//!   rebalance policy is consulted at every interior period boundary
//! - Misaligned series are a fatal error — a gap is never zero-filled
//! - No partial results: the full `BackTest` or an error
//! - Summary metrics (CAGR, doubling time) derive lazily from the result

mod engine;
mod metrics;
mod types;

pub use engine::{BacktestEngine, BacktestError};
pub use metrics::MetricsError;
pub use types::{Allocation, BackTest, BacktestRequest, PORTFOLIO_TICKER};

// The request/result types are built from these; re-exported so callers
// need not depend on the leaf crates directly.
pub use fbk_projection::Tick;
pub use fbk_rebalance::{RebalanceEvent, RebalanceStrategy};
pub use fbk_returns::{Granularity, PeriodReturn, ProviderError, ReturnsProvider, ReturnsRequest};
