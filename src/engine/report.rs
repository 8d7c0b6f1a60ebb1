// src/engine/report.rs

//! Summary of a finished run.

use std::fmt;

use crate::errors::{PublishFailure, Result, TaskFailure, WavebuildError};
use crate::types::{GroupId, TaskId, VariantArtifact};

/// A group that reached finalization and went through the publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedGroup {
    pub group: GroupId,
    /// Aggregate reference, or `None` when publishing was disabled.
    pub reference: Option<String>,
    pub artifacts: Vec<VariantArtifact>,
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    Task(TaskFailure),
    Publish(PublishFailure),
    /// The task's worker panicked; no result was produced.
    Lost(TaskId),
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::Task(e) => write!(f, "{e}"),
            RunFailure::Publish(e) => write!(f, "{e}"),
            RunFailure::Lost(task) => write!(f, "build of {task} was lost (worker panicked)"),
        }
    }
}

/// Outcome of [`crate::engine::Driver::run`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Groups in the order they were published.
    pub published: Vec<PublishedGroup>,
    pub failures: Vec<RunFailure>,
    /// Tasks that never ran because the run was aborted.
    pub cancelled: Vec<TaskId>,
    /// Build tasks that finished successfully.
    pub completed: usize,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn published_group(&self, group: &str) -> Option<&PublishedGroup> {
        self.published.iter().find(|p| p.group == group)
    }

    /// Turn a failed report into [`WavebuildError::RunFailed`].
    pub fn into_result(self) -> Result<RunReport> {
        if self.succeeded() {
            return Ok(self);
        }

        let details = self
            .failures
            .iter()
            .map(|f| format!("  - {f}"))
            .collect::<Vec<_>>()
            .join("\n");
        Err(WavebuildError::RunFailed(format!(
            "{} failure(s), {} task(s) cancelled:\n{details}",
            self.failures.len(),
            self.cancelled.len()
        )))
    }
}
