// src/engine/status.rs

//! Write-only lifecycle reporting.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::types::{GroupId, TaskId};

/// A task or group lifecycle transition, for progress displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    TaskQueued { task: TaskId },
    TaskStarted { task: TaskId },
    TaskSucceeded { task: TaskId, reference: String },
    TaskFailed { task: TaskId, message: String, log: Option<PathBuf> },
    TaskCancelled { task: TaskId },
    GroupFinalized { group: GroupId, artifacts: usize },
    WaveUnlocked { group: GroupId, unlocked_by: GroupId },
    Published { group: GroupId, reference: String },
    PublishSkipped { group: GroupId },
    PublishFailed { group: GroupId, message: String, log: Option<PathBuf> },
    Aborted { cancelled: usize },
}

/// Receives status events. Implementations must not fail or block for long;
/// nothing they do can influence scheduling.
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: &StatusEvent);
}

/// Renders status events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn emit(&self, event: &StatusEvent) {
        match event {
            StatusEvent::TaskQueued { task } => debug!(task = %task, "queued"),
            StatusEvent::TaskStarted { task } => info!(task = %task, "rebuilding"),
            StatusEvent::TaskSucceeded { task, reference } => {
                info!(task = %task, reference = %reference, "finished build")
            }
            StatusEvent::TaskFailed { task, message, log } => {
                error!(task = %task, log = ?log, "build failed: {message}")
            }
            StatusEvent::TaskCancelled { task } => debug!(task = %task, "cancelled"),
            StatusEvent::GroupFinalized { group, artifacts } => {
                info!(group = %group, artifacts, "all variants finished")
            }
            StatusEvent::WaveUnlocked { group, unlocked_by } => {
                info!(group = %group, unlocked_by = %unlocked_by, "wave unlocked")
            }
            StatusEvent::Published { group, reference } => {
                info!(group = %group, reference = %reference, "finished manifest")
            }
            StatusEvent::PublishSkipped { group } => info!(group = %group, "skip publish"),
            StatusEvent::PublishFailed { group, message, log } => {
                error!(group = %group, log = ?log, "publish failed: {message}")
            }
            StatusEvent::Aborted { cancelled } => {
                warn!(cancelled, "error(s) occurred; aborting remaining work")
            }
        }
    }
}
