// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{GroupId, TaskId};

#[derive(Error, Debug)]
pub enum WavebuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Cycle detected in build plan: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    TaskFailure(#[from] TaskFailure),

    #[error(transparent)]
    PublishFailure(#[from] PublishFailure),

    /// Internal scheduling invariant breach. Never retried.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An external build step failed for one variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub message: String,
    /// File holding the command line and raw output of the failed step.
    pub log: Option<PathBuf>,
}

impl TaskFailure {
    pub fn new(task: TaskId, message: impl Into<String>) -> Self {
        Self {
            task,
            message: message.into(),
            log: None,
        }
    }

    pub fn with_log(mut self, log: Option<PathBuf>) -> Self {
        self.log = log;
        self
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build of {} failed: {}", self.task, self.message)?;
        if let Some(log) = &self.log {
            write!(f, " (see {})", log.display())?;
        }
        Ok(())
    }
}

/// The aggregate publish step failed for a finalized group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub group: GroupId,
    pub message: String,
    pub log: Option<PathBuf>,
}

impl PublishFailure {
    pub fn new(group: impl Into<GroupId>, message: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            message: message.into(),
            log: None,
        }
    }

    pub fn with_log(mut self, log: Option<PathBuf>) -> Self {
        self.log = log;
        self
    }
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "publish of {} failed: {}", self.group, self.message)?;
        if let Some(log) = &self.log {
            write!(f, " (see {})", log.display())?;
        }
        Ok(())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WavebuildError>;

/// Shorthand for building a [`WavebuildError::ProtocolViolation`].
pub(crate) fn violation(msg: impl Into<String>) -> WavebuildError {
    WavebuildError::ProtocolViolation(msg.into())
}
