use serde::{Deserialize, Serialize};

/// When constituent balances are reset toward target allocations.
///
/// Strategies are mutually exclusive single choices; calendar and band
/// checks do not combine. Band thresholds (required by the two `Bands*`
/// variants, meaningless to the rest) are 0-100 scale:
///
/// - `BandsAbsolute`: trigger when any constituent's current weight is more
///   than `threshold` percentage points away from its target weight.
/// - `BandsRelative`: trigger when the deviation exceeds
///   `target × threshold / 100` (a proportional band).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebalanceStrategy {
    None,
    Annually,
    SemiAnnually,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
    BandsAbsolute,
    BandsRelative,
}

impl RebalanceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RebalanceStrategy::None => "none",
            RebalanceStrategy::Annually => "annually",
            RebalanceStrategy::SemiAnnually => "semiAnnually",
            RebalanceStrategy::Quarterly => "quarterly",
            RebalanceStrategy::Monthly => "monthly",
            RebalanceStrategy::Weekly => "weekly",
            RebalanceStrategy::Daily => "daily",
            RebalanceStrategy::BandsAbsolute => "bandsAbsolute",
            RebalanceStrategy::BandsRelative => "bandsRelative",
        }
    }

    /// `true` for the band strategies, which cannot evaluate without a
    /// configured threshold.
    pub fn requires_threshold(&self) -> bool {
        matches!(
            self,
            RebalanceStrategy::BandsAbsolute | RebalanceStrategy::BandsRelative
        )
    }

    /// Month cadence from the anchor for the day-of-month calendar
    /// strategies; `None` for everything else.
    pub fn cadence_months(&self) -> Option<i32> {
        match self {
            RebalanceStrategy::Annually => Some(12),
            RebalanceStrategy::SemiAnnually => Some(6),
            RebalanceStrategy::Quarterly => Some(3),
            RebalanceStrategy::Monthly => Some(1),
            _ => None,
        }
    }
}

impl std::fmt::Display for RebalanceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
