//! Per-portfolio rebalance decision state machine.
//!
//! Lifecycle per period boundary:
//!
//! ```text
//! Idle ──evaluate()──▶ Evaluating ──┬─▶ Idle         (Hold)
//!                                   └─▶ Rebalancing  (Rebalance)
//!                                          │
//!                                   settle()──▶ Idle
//! ```
//!
//! `evaluate` is called once after each period closes, with every
//! constituent's just-computed ending balance. On `Rebalance` the caller
//! resets balances via [`reset_to_targets`] and then calls `settle`.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::strategy::RebalanceStrategy;

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A band strategy was configured without a threshold.
    MissingThreshold { strategy: RebalanceStrategy },
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::MissingThreshold { strategy } => {
                write!(f, "strategy '{strategy}' requires a rebalance threshold")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

// ─── State machine ───────────────────────────────────────────────────────────

/// Where the policy sits between `evaluate`/`settle` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Idle,
    Evaluating,
    Rebalancing,
}

/// Outcome of one boundary evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Hold,
    Rebalance,
}

/// One portfolio's rebalance policy.
///
/// `anchor` is the portfolio's original start date — the first aligned
/// period start. Calendar cadences count months (or weekdays) from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalancePolicy {
    strategy: RebalanceStrategy,
    threshold: Option<Decimal>,
    anchor: NaiveDate,
    state: PolicyState,
}

impl RebalancePolicy {
    pub fn new(
        strategy: RebalanceStrategy,
        threshold: Option<Decimal>,
        anchor: NaiveDate,
    ) -> Result<Self, PolicyError> {
        if strategy.requires_threshold() && threshold.is_none() {
            return Err(PolicyError::MissingThreshold { strategy });
        }
        Ok(Self {
            strategy,
            threshold,
            anchor,
            state: PolicyState::Idle,
        })
    }

    pub fn strategy(&self) -> RebalanceStrategy {
        self.strategy
    }

    pub fn threshold(&self) -> Option<Decimal> {
        self.threshold
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Evaluate the boundary after a period closes.
    ///
    /// `next_period_start` — start date of the period about to open.
    /// `balances` — each constituent's just-computed ending balance.
    /// `targets` — each constituent's target weight (0-100).
    ///
    /// Returns `Rebalance` and parks in [`PolicyState::Rebalancing`] when the
    /// configured trigger fires; otherwise returns to `Idle`.
    pub fn evaluate(
        &mut self,
        next_period_start: NaiveDate,
        balances: &BTreeMap<String, Decimal>,
        targets: &BTreeMap<String, Decimal>,
    ) -> PolicyAction {
        self.state = PolicyState::Evaluating;

        let fired = match self.strategy {
            RebalanceStrategy::None => false,
            RebalanceStrategy::Daily => true,
            RebalanceStrategy::Weekly => {
                next_period_start > self.anchor
                    && next_period_start.weekday() == self.anchor.weekday()
            }
            RebalanceStrategy::Annually
            | RebalanceStrategy::SemiAnnually
            | RebalanceStrategy::Quarterly
            | RebalanceStrategy::Monthly => self.calendar_due(next_period_start),
            RebalanceStrategy::BandsAbsolute | RebalanceStrategy::BandsRelative => {
                self.band_breached(balances, targets)
            }
        };

        if fired {
            self.state = PolicyState::Rebalancing;
            PolicyAction::Rebalance
        } else {
            self.state = PolicyState::Idle;
            PolicyAction::Hold
        }
    }

    /// Return to `Idle` once the caller has applied the reset.
    pub fn settle(&mut self) {
        self.state = PolicyState::Idle;
    }

    fn calendar_due(&self, next: NaiveDate) -> bool {
        let Some(cadence) = self.strategy.cadence_months() else {
            return false;
        };
        if next.day() != self.anchor.day() {
            return false;
        }
        let months = (next.year() - self.anchor.year()) * 12
            + (next.month() as i32 - self.anchor.month() as i32);
        months > 0 && months % cadence == 0
    }

    fn band_breached(
        &self,
        balances: &BTreeMap<String, Decimal>,
        targets: &BTreeMap<String, Decimal>,
    ) -> bool {
        let Some(threshold) = self.threshold else {
            return false;
        };
        let total: Decimal = balances.values().copied().sum();
        if total <= Decimal::ZERO {
            return false;
        }

        for (ticker, target) in targets {
            let balance = balances.get(ticker).copied().unwrap_or_default();
            let weight = balance / total * Decimal::ONE_HUNDRED;
            let deviation = (weight - *target).abs();
            let band = match self.strategy {
                RebalanceStrategy::BandsAbsolute => threshold,
                RebalanceStrategy::BandsRelative => *target * threshold / Decimal::ONE_HUNDRED,
                _ => return false,
            };
            // Strictly more-than: sitting exactly on the band edge holds.
            if deviation > band {
                return true;
            }
        }
        false
    }
}

// ─── Target reset ────────────────────────────────────────────────────────────

/// Redistribute the (unchanged) total across constituents at their target
/// weights: each gets `total × target / 100`.
pub fn reset_to_targets(
    balances: &BTreeMap<String, Decimal>,
    targets: &BTreeMap<String, Decimal>,
) -> BTreeMap<String, Decimal> {
    let total: Decimal = balances.values().copied().sum();
    targets
        .iter()
        .map(|(ticker, pct)| (ticker.clone(), total * *pct / Decimal::ONE_HUNDRED))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn balances(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(t, b)| (t.to_string(), *b)).collect()
    }

    fn fifty_fifty() -> BTreeMap<String, Decimal> {
        balances(&[("#1X", dec!(50)), ("#3X", dec!(50))])
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn band_strategy_without_threshold_rejected() {
        let err =
            RebalancePolicy::new(RebalanceStrategy::BandsAbsolute, None, d(2023, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            PolicyError::MissingThreshold {
                strategy: RebalanceStrategy::BandsAbsolute
            }
        );
        assert!(RebalancePolicy::new(RebalanceStrategy::BandsRelative, None, d(2023, 1, 1)).is_err());
    }

    #[test]
    fn calendar_strategy_without_threshold_allowed() {
        assert!(RebalancePolicy::new(RebalanceStrategy::Quarterly, None, d(2023, 1, 1)).is_ok());
    }

    // ── State machine ────────────────────────────────────────────────────────

    #[test]
    fn hold_returns_to_idle() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::None, None, d(2023, 1, 1)).unwrap();
        assert_eq!(p.state(), PolicyState::Idle);
        let action = p.evaluate(d(2023, 2, 1), &fifty_fifty(), &fifty_fifty());
        assert_eq!(action, PolicyAction::Hold);
        assert_eq!(p.state(), PolicyState::Idle);
    }

    #[test]
    fn trigger_parks_in_rebalancing_until_settled() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Daily, None, d(2023, 1, 1)).unwrap();
        let action = p.evaluate(d(2023, 1, 2), &fifty_fifty(), &fifty_fifty());
        assert_eq!(action, PolicyAction::Rebalance);
        assert_eq!(p.state(), PolicyState::Rebalancing);
        p.settle();
        assert_eq!(p.state(), PolicyState::Idle);
    }

    // ── Calendar strategies ──────────────────────────────────────────────────

    #[test]
    fn none_never_triggers() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::None, None, d(2023, 1, 15)).unwrap();
        for next in [d(2023, 2, 15), d(2024, 1, 15), d(2033, 1, 15)] {
            assert_eq!(
                p.evaluate(next, &fifty_fifty(), &fifty_fifty()),
                PolicyAction::Hold
            );
        }
    }

    #[test]
    fn daily_triggers_after_every_period() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Daily, None, d(2023, 1, 1)).unwrap();
        assert_eq!(
            p.evaluate(d(2023, 1, 2), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
        p.settle();
        assert_eq!(
            p.evaluate(d(2023, 1, 3), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
    }

    #[test]
    fn weekly_triggers_on_anchor_weekday_only() {
        // 2023-01-02 is a Monday.
        let mut p = RebalancePolicy::new(RebalanceStrategy::Weekly, None, d(2023, 1, 2)).unwrap();
        assert_eq!(
            p.evaluate(d(2023, 1, 5), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold,
            "Thursday is not the anchor weekday"
        );
        assert_eq!(
            p.evaluate(d(2023, 1, 9), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance,
            "next Monday"
        );
    }

    #[test]
    fn monthly_triggers_on_anchor_day_each_month() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Monthly, None, d(2023, 1, 15)).unwrap();
        assert_eq!(
            p.evaluate(d(2023, 2, 15), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
        p.settle();
        assert_eq!(
            p.evaluate(d(2023, 2, 16), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold
        );
    }

    #[test]
    fn quarterly_skips_intermediate_months() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Quarterly, None, d(2023, 1, 1)).unwrap();
        assert_eq!(
            p.evaluate(d(2023, 2, 1), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold
        );
        assert_eq!(
            p.evaluate(d(2023, 4, 1), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
        p.settle();
        assert_eq!(
            p.evaluate(d(2023, 7, 1), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
    }

    #[test]
    fn semi_annual_and_annual_cadences() {
        let mut semi =
            RebalancePolicy::new(RebalanceStrategy::SemiAnnually, None, d(2023, 3, 10)).unwrap();
        assert_eq!(
            semi.evaluate(d(2023, 9, 10), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );

        let mut annual =
            RebalancePolicy::new(RebalanceStrategy::Annually, None, d(2023, 3, 10)).unwrap();
        assert_eq!(
            annual.evaluate(d(2023, 9, 10), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold
        );
        assert_eq!(
            annual.evaluate(d(2024, 3, 10), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
    }

    #[test]
    fn anchor_date_itself_does_not_trigger() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Monthly, None, d(2023, 1, 15)).unwrap();
        assert_eq!(
            p.evaluate(d(2023, 1, 15), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold
        );
    }

    #[test]
    fn anchor_day_31_holds_through_short_months() {
        let mut p = RebalancePolicy::new(RebalanceStrategy::Monthly, None, d(2023, 1, 31)).unwrap();
        // February's boundary lands on the clamped 28th, not the 31st.
        assert_eq!(
            p.evaluate(d(2023, 2, 28), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Hold
        );
        assert_eq!(
            p.evaluate(d(2023, 3, 31), &fifty_fifty(), &fifty_fifty()),
            PolicyAction::Rebalance
        );
    }

    // ── Band strategies ──────────────────────────────────────────────────────

    #[test]
    fn absolute_band_triggers_past_threshold() {
        let targets = fifty_fifty();
        let mut p =
            RebalancePolicy::new(RebalanceStrategy::BandsAbsolute, Some(dec!(1)), d(2023, 1, 1))
                .unwrap();

        // 50.5 / 49.5 — inside the 1-point band.
        let inside = balances(&[("#1X", dec!(50.5)), ("#3X", dec!(49.5))]);
        assert_eq!(p.evaluate(d(2023, 1, 2), &inside, &targets), PolicyAction::Hold);

        // Exactly 51 / 49 — on the edge, still holds (strict >).
        let edge = balances(&[("#1X", dec!(51)), ("#3X", dec!(49))]);
        assert_eq!(p.evaluate(d(2023, 1, 2), &edge, &targets), PolicyAction::Hold);

        // 51.2 / 48.8 — breached.
        let outside = balances(&[("#1X", dec!(51.2)), ("#3X", dec!(48.8))]);
        assert_eq!(
            p.evaluate(d(2023, 1, 2), &outside, &targets),
            PolicyAction::Rebalance
        );
    }

    #[test]
    fn relative_band_scales_with_target_weight() {
        // 10% of a 20-point target = 2-point band; 10% of 80 = 8-point band.
        let targets = balances(&[("#1X", dec!(20)), ("#3X", dec!(80))]);
        let mut p =
            RebalancePolicy::new(RebalanceStrategy::BandsRelative, Some(dec!(10)), d(2023, 1, 1))
                .unwrap();

        let inside = balances(&[("#1X", dec!(21.5)), ("#3X", dec!(78.5))]);
        assert_eq!(p.evaluate(d(2023, 1, 2), &inside, &targets), PolicyAction::Hold);

        let outside = balances(&[("#1X", dec!(22.5)), ("#3X", dec!(77.5))]);
        assert_eq!(
            p.evaluate(d(2023, 1, 2), &outside, &targets),
            PolicyAction::Rebalance
        );
    }

    #[test]
    fn single_constituent_never_band_triggers() {
        // A single-asset portfolio is always at 100% of itself; the deviation
        // is identically zero whatever the balance does.
        let targets = balances(&[("#2X", dec!(100))]);
        let mut p =
            RebalancePolicy::new(RebalanceStrategy::BandsAbsolute, Some(dec!(0.5)), d(2023, 1, 1))
                .unwrap();
        for bal in [dec!(1), dec!(250), dec!(99999.99)] {
            let b = balances(&[("#2X", bal)]);
            assert_eq!(p.evaluate(d(2023, 1, 2), &b, &targets), PolicyAction::Hold);
        }
    }

    #[test]
    fn zero_total_balance_holds() {
        let targets = fifty_fifty();
        let b = balances(&[("#1X", dec!(0)), ("#3X", dec!(0))]);
        let mut p =
            RebalancePolicy::new(RebalanceStrategy::BandsAbsolute, Some(dec!(1)), d(2023, 1, 1))
                .unwrap();
        assert_eq!(p.evaluate(d(2023, 1, 2), &b, &targets), PolicyAction::Hold);
    }

    // ── reset_to_targets ─────────────────────────────────────────────────────

    #[test]
    fn reset_restores_target_proportions_exactly() {
        let targets = fifty_fifty();
        let drifted = balances(&[("#1X", dec!(130)), ("#3X", dec!(70))]);
        let reset = reset_to_targets(&drifted, &targets);
        assert_eq!(reset["#1X"], dec!(100));
        assert_eq!(reset["#3X"], dec!(100));
    }

    #[test]
    fn reset_preserves_total_balance() {
        let targets = balances(&[("#1X", dec!(25)), ("#2X", dec!(35)), ("#3X", dec!(40))]);
        let drifted = balances(&[
            ("#1X", dec!(311.07)),
            ("#2X", dec!(95.5)),
            ("#3X", dec!(200.43)),
        ]);
        let total_before: Decimal = drifted.values().copied().sum();
        let reset = reset_to_targets(&drifted, &targets);
        let total_after: Decimal = reset.values().copied().sum();
        assert_eq!(total_before, total_after);
        assert_eq!(reset["#2X"], total_before * dec!(35) / dec!(100));
    }
}
