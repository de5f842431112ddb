use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use fbk_returns::PeriodReturn;

// ─── Tick ────────────────────────────────────────────────────────────────────

/// One period's performance record: the period's return plus the balance the
/// period opened with. Immutable once created.
///
/// Ending balance and balance increase are derived, never stored:
/// `ending = starting × (1 + return/100)`. Serialization emits the derived
/// fields so downstream consumers (e.g. an HTTP layer) see the full record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub period: PeriodReturn,
    pub starting_balance: Decimal,
}

impl Tick {
    pub fn new(period: PeriodReturn, starting_balance: Decimal) -> Self {
        Self {
            period,
            starting_balance,
        }
    }

    /// `starting × (1 + return/100)`, exact decimal.
    pub fn ending_balance(&self) -> Decimal {
        self.starting_balance * (Decimal::ONE_HUNDRED + self.period.return_pct)
            / Decimal::ONE_HUNDRED
    }

    pub fn balance_increase(&self) -> Decimal {
        self.ending_balance() - self.starting_balance
    }
}

impl Serialize for Tick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Tick", 5)?;
        st.serialize_field("periodStart", &self.period.period_start)?;
        st.serialize_field("returnPercentage", &self.period.return_pct)?;
        st.serialize_field("startingBalance", &self.starting_balance)?;
        st.serialize_field("endingBalance", &self.ending_balance())?;
        st.serialize_field("balanceIncrease", &self.balance_increase())?;
        st.end()
    }
}

// ─── Projector ───────────────────────────────────────────────────────────────

/// Sequential compounding state for one constituent.
///
/// `advance` consumes one period and emits its Tick; the held balance becomes
/// that tick's ending balance, so consecutive ticks chain exactly. `rebase`
/// overwrites the held balance between periods (rebalancing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projector {
    balance: Decimal,
}

impl Projector {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            balance: starting_balance,
        }
    }

    /// Balance the next period will open with.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Apply one period and return its Tick.
    pub fn advance(&mut self, period: &PeriodReturn) -> Tick {
        let tick = Tick::new(period.clone(), self.balance);
        self.balance = tick.ending_balance();
        tick
    }

    /// Overwrite the balance the next period opens with.
    pub fn rebase(&mut self, balance: Decimal) {
        self.balance = balance;
    }
}

/// Project a whole series in one pure fold.
///
/// `from`, when given, discards periods starting before it — the engine uses
/// this to align constituents begun at different historical depths. Produces
/// exactly one Tick per remaining period; each tick's starting balance equals
/// the prior tick's ending balance.
pub fn project(
    periods: &[PeriodReturn],
    starting_balance: Decimal,
    from: Option<NaiveDate>,
) -> Vec<Tick> {
    let mut projector = Projector::new(starting_balance);
    periods
        .iter()
        .filter(|p| from.map_or(true, |d| p.period_start >= d))
        .map(|p| projector.advance(p))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
