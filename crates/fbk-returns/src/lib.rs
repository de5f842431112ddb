//! fbk-returns
//!
//! Period-return series model and the provider boundary.
//!
//! - `Granularity` / `PeriodReturn`: the normalized, date-ordered return
//!   series one backtest constituent is built from.
//! - `ReturnsProvider`: the injectable contract a return-history source
//!   (cache, database, market-data API) must satisfy. No concrete provider
//!   implementations live here.
//! - `series`: contiguity validation and window-alignment utilities.
//! - `synthetic`: ticker formatting for synthetic index labels (incidental
//!   naming, not backtest logic).

pub mod provider;
pub mod series;
pub mod synthetic;
mod types;

pub use provider::{ProviderError, ReturnsProvider, ReturnsRequest};
pub use series::SeriesError;
pub use synthetic::{MarketCap, Region, Style, SyntheticIndex};
pub use types::{Granularity, PeriodReturn};
