// src/exec/mod.rs

//! Execution layer.
//!
//! - [`pool`] is the bounded worker pool every build task runs on.
//! - [`backend`] defines the `TaskExecutor` and `Publisher` traits the
//!   driver calls; tests replace them with scripted fakes.
//! - [`docker`] implements both with the `docker` CLI.
//! - [`command`] runs external commands and keeps logs of failures.

pub mod backend;
pub mod command;
pub mod docker;
pub mod pool;

pub use backend::{BoxFuture, Publisher, TaskExecutor};
pub use docker::{DockerExecutor, DockerPublisher};
pub use pool::{CancelHandle, JobHandle, JobOutcome, Task, WorkerPool};
