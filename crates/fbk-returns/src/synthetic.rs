//! Synthetic-index ticker formatting.
//!
//! Synthetic index series (back-filled composites rather than listed
//! instruments) are labeled by a `#`-prefixed code derived from region,
//! market cap, and style — e.g. `#2X` for a US mid-cap blend. The code is
//! incidental labeling for the return-history source; nothing in the
//! backtest core interprets it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    Us,
    International,
    Emerging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarketCap {
    Large,
    Mid,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    Blend,
    Value,
    Growth,
}

/// Tagged description of a synthetic index.
///
/// `ticker()` renders the canonical label: `#`, one digit encoding region +
/// market cap (US 1-3, international 4-6, emerging 7-9, large → small within
/// each region), and one style letter (`X` blend, `V` value, `G` growth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntheticIndex {
    pub region: Region,
    pub market_cap: MarketCap,
    pub style: Style,
}

impl SyntheticIndex {
    pub fn new(region: Region, market_cap: MarketCap, style: Style) -> Self {
        Self {
            region,
            market_cap,
            style,
        }
    }

    pub fn ticker(&self) -> String {
        let base = match self.region {
            Region::Us => 0,
            Region::International => 3,
            Region::Emerging => 6,
        };
        let cap = match self.market_cap {
            MarketCap::Large => 1,
            MarketCap::Mid => 2,
            MarketCap::Small => 3,
        };
        let style = match self.style {
            Style::Blend => 'X',
            Style::Value => 'V',
            Style::Growth => 'G',
        };
        format!("#{}{}", base + cap, style)
    }
}

impl std::fmt::Display for SyntheticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.ticker())
    }
}
