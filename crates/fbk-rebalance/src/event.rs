use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use fbk_returns::Granularity;

/// One constituent's balance reset, recorded when the policy fires at a
/// period boundary.
///
/// `period_start` is the start of the completed period that preceded the
/// reset. `percentage_change` is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceEvent {
    pub ticker: String,
    pub period_start: NaiveDate,
    pub granularity: Granularity,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
}

impl RebalanceEvent {
    /// `(after/before − 1) × 100`, 0-100 scale. Zero when the before-balance
    /// is zero (no meaningful relative change exists).
    pub fn percentage_change(&self) -> Decimal {
        if self.balance_before.is_zero() {
            return Decimal::ZERO;
        }
        (self.balance_after - self.balance_before) / self.balance_before * Decimal::ONE_HUNDRED
    }
}

impl Serialize for RebalanceEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("RebalanceEvent", 4)?;
        st.serialize_field("precedingPeriodStart", &self.period_start)?;
        st.serialize_field("balanceBefore", &self.balance_before)?;
        st.serialize_field("balanceAfter", &self.balance_after)?;
        st.serialize_field("percentageChange", &self.percentage_change())?;
        st.end()
    }
}
