// src/engine/mod.rs

//! Orchestration engine for wavebuild.
//!
//! This module ties together:
//! - the barrier registry and aggregator from [`crate::dag`]
//! - the worker pool and collaborators from [`crate::exec`]
//! - the drain loop that runs a build plan wave by wave
//!
//! The scheduler lives in [`driver`]; [`status`] carries lifecycle events to
//! a display and [`report`] summarises the outcome.

pub mod driver;
pub mod report;
pub mod status;

pub use driver::Driver;
pub use report::{PublishedGroup, RunFailure, RunReport};
pub use status::{LogStatusSink, StatusEvent, StatusSink};

/// Static parameters of a run, fixed at driver construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of build tasks running at once (>= 1; 1 is fully
    /// serial and deterministic).
    pub max_parallelism: usize,
    /// Publish each finalized group. When false, groups still finalize and
    /// unlock their dependents, but the publisher is never called.
    pub publish_enabled: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_parallelism: 1,
            publish_enabled: true,
        }
    }
}
