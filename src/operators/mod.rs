//! Scoring operators: one per dimension, registered at compile time.
//!
//! Every operator exposes the same capability set (`key`, `weight_key`,
//! `component_key`, optional `cheap`, `evaluate`). Operators are pure functions of a
//! [`MatchContext`]; missing data is reported as [`Signal::Absent`] and collapsed to
//! the operator's neutral baseline only when a plain number is needed.
//!
//! # Cheap-bound contract
//!
//! When [`Operator::cheap`] returns `Some(bound)`, `bound >= operator.score(ctx)` for
//! the same context. Pruning in [`crate::scoring::MatchEngine::rank`] is exact only
//! because of this.

pub mod context;
pub mod operator;
pub mod types;


pub use context::MatchContext;
pub use operator::{OPERATORS, Operator};
pub use types::{Evaluation, Signal, TraitSource};
