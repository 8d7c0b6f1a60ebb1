// src/exec/backend.rs

//! Pluggable collaborator abstractions.
//!
//! The driver talks to a [`TaskExecutor`] and a [`Publisher`] instead of
//! invoking the build tool directly. Production code uses the Docker
//! implementations in [`super::docker`]; tests provide scripted fakes that
//! record calls and inject failures.

use std::future::Future;
use std::pin::Pin;

use crate::dag::BuildSpec;
use crate::errors::{PublishFailure, TaskFailure};
use crate::types::{GroupId, VariantArtifact};

/// Boxed future returned by collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Builds one variant of one group.
pub trait TaskExecutor: Send + Sync {
    /// Produce the artifact for `spec`, or report why that failed.
    ///
    /// May be slow; latency and failure characteristics are the
    /// implementation's own concern.
    fn run(&self, spec: BuildSpec) -> BoxFuture<'_, Result<VariantArtifact, TaskFailure>>;
}

/// Combines the per-variant artifacts of a finalized group into one
/// addressable reference.
pub trait Publisher: Send + Sync {
    /// Publish `group`, returning the aggregate reference.
    fn publish(
        &self,
        group: GroupId,
        artifacts: Vec<VariantArtifact>,
    ) -> BoxFuture<'_, Result<String, PublishFailure>>;
}
