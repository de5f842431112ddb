//! fbk-rebalance
//!
//! Rebalance policy engine: decides, after each completed period, whether
//! constituent balances must be reset toward target allocations.
//!
//! - One policy instance per portfolio (not per constituent) — a trigger
//!   resets every constituent simultaneously.
//! - Calendar strategies compare the *next* period's start date against the
//!   portfolio's anchor date; band strategies compare current weights
//!   against target weights.
//! - Resetting redistributes the total portfolio balance; it never creates
//!   or destroys value.
//! - Pure deterministic logic (no IO, no clock — dates come from the series).

mod event;
mod policy;
mod strategy;

pub use event::RebalanceEvent;
pub use policy::{reset_to_targets, PolicyAction, PolicyError, PolicyState, RebalancePolicy};
pub use strategy::RebalanceStrategy;
