//! fbk-projection
//!
//! Performance projection: one return series + one starting balance → one
//! per-period balance trajectory.
//!
//! - Purely sequential fold; no period skipped or reordered.
//! - No rebalancing here — that is the engine's job. The projector only
//!   compounds, and exposes `rebase` so an orchestrator can overwrite the
//!   next period's starting balance.
//! - All balance arithmetic is exact decimal; return percentages are 0-100
//!   scale throughout.

mod projector;

pub use projector::{project, Projector, Tick};
