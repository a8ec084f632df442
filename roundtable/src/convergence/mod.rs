//! The convergence decision engine: a pure function deciding, after
//! each iteration, whether a session should stop and why.

mod delta;
mod engine;

pub use delta::delta;
pub use engine::{decide, delta_metric_name, ConvergenceConfig, CustomPredicate, StopDecision};
