// src/dag/mod.rs

//! Build plan DAG and the shared completion state.
//!
//! - [`graph`] holds the DAG of groups with precomputed dependents.
//! - [`barrier`] contains the per-group countdown barriers and abort flag.
//! - [`aggregator`] collects per-group artifacts for publishing.
//! - [`task_info`] provides build task and continuation types.

pub mod aggregator;
pub mod barrier;
pub mod graph;
pub mod task_info;

pub use aggregator::Aggregator;
pub use barrier::{CompletionRegistry, FinalizationDecision};
pub use graph::{BuildPlan, GroupNode};
pub use task_info::{BuildSpec, Continuation};
