//! Provider boundary for return-history ingestion.
//!
//! This module defines **only** the fetch request type, the error type, and
//! the provider trait. No concrete provider implementations, no caching, no
//! network logic belong here — the backtest core stays a pure function of an
//! injected provider.

use std::fmt;

use chrono::NaiveDate;

use crate::types::{Granularity, PeriodReturn};

// ---------------------------------------------------------------------------
// Fetch request
// ---------------------------------------------------------------------------

/// Parameters for one historical fetch passed to a [`ReturnsProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnsRequest {
    /// Ticker symbol exactly as supplied by the caller (e.g. `"#2X"`).
    pub ticker: String,
    pub granularity: Granularity,
    /// Inclusive first period start.
    pub start: NaiveDate,
    /// Inclusive last period start.
    pub end: NaiveDate,
}

impl ReturnsRequest {
    pub fn new<S: Into<String>>(
        ticker: S,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            granularity,
            start,
            end,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`ReturnsProvider`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No return history exists for this ticker/granularity combination.
    NotFound {
        ticker: String,
        granularity: Granularity,
    },
    /// Network or transport failure in the backing source.
    Transport(String),
    /// A payload from the backing source could not be decoded.
    Decode(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotFound {
                ticker,
                granularity,
            } => {
                write!(f, "no {granularity} return history for ticker '{ticker}'")
            }
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Injectable return-history source.
///
/// Implementations must be object-safe so callers can hold an
/// `Arc<dyn ReturnsProvider>` without knowing the concrete type, and
/// `Send + Sync` so whole backtests can run on worker threads.
///
/// Contract: the returned series covers `[req.start, req.end]`, is ordered
/// by strictly increasing `period_start`, contiguous per the granularity's
/// calendar step, and fails with [`ProviderError::NotFound`] when no history
/// exists. Retry policy, caching, and consistency are the implementation's
/// concern, never the engine's.
pub trait ReturnsProvider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"quote-cache"`).
    fn name(&self) -> &'static str;

    /// Fetch the ordered per-period return series for one ticker.
    fn fetch_returns(&self, req: &ReturnsRequest) -> Result<Vec<PeriodReturn>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
