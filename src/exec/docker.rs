// src/exec/docker.rs

//! Docker-backed executor and publisher used in production.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::dag::BuildSpec;
use crate::errors::{PublishFailure, TaskFailure};
use crate::exec::backend::{BoxFuture, Publisher, TaskExecutor};
use crate::exec::command::{run_ignoring_failure, run_or_report, CommandFailure};
use crate::types::{GroupId, TaskId, VariantArtifact};

/// Per-variant image reference: `<registry><group>/<variant>`.
pub fn variant_reference(registry: &str, task: &TaskId) -> String {
    format!("{registry}{}/{}", task.group, task.variant)
}

/// Multi-architecture manifest reference: `<registry><group>:latest`.
pub fn manifest_reference(registry: &str, group: &str) -> String {
    format!("{registry}{group}:latest")
}

/// Expand `{registry}`, `{group}` and `{variant}` in build instructions.
pub fn expand_dockerfile(template: &str, registry: &str, task: &TaskId) -> String {
    template
        .replace("{registry}", registry)
        .replace("{group}", &task.group)
        .replace("{variant}", &task.variant)
}

/// Builds (and optionally pushes) one image variant with `docker build`.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    docker: String,
    registry: String,
    context_dir: PathBuf,
    no_cache: bool,
    push: bool,
}

impl DockerExecutor {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            docker: "docker".to_string(),
            registry: registry.into(),
            context_dir: PathBuf::from("."),
            no_cache: false,
            push: true,
        }
    }

    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn with_context_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.context_dir = dir.into();
        self
    }

    pub fn with_docker_binary(mut self, docker: impl Into<String>) -> Self {
        self.docker = docker.into();
        self
    }

    async fn build(&self, spec: BuildSpec) -> Result<VariantArtifact, TaskFailure> {
        let id = spec.id;
        let tag = variant_reference(&self.registry, &id);
        let contents = expand_dockerfile(&spec.dockerfile, &self.registry, &id);

        // Kept alive until the build has finished reading it.
        let mut dockerfile = tempfile::Builder::new()
            .prefix(".wavebuild-")
            .suffix(".Dockerfile")
            .tempfile_in(&self.context_dir)
            .map_err(|e| TaskFailure::new(id.clone(), format!("creating Dockerfile: {e}")))?;
        dockerfile
            .write_all(contents.as_bytes())
            .and_then(|_| dockerfile.flush())
            .map_err(|e| TaskFailure::new(id.clone(), format!("writing Dockerfile: {e}")))?;

        let mut args = vec![
            "build".to_string(),
            "--pull".to_string(),
            "-f".to_string(),
            dockerfile.path().display().to_string(),
            "-t".to_string(),
            tag.clone(),
        ];
        if self.no_cache {
            args.push("--no-cache".to_string());
        }
        args.push(self.context_dir.display().to_string());

        info!(task = %id, tag = %tag, "building image");
        run_or_report(&self.docker, &args)
            .await
            .map_err(|f| task_failure(&id, f))?;

        if self.push {
            info!(task = %id, tag = %tag, "pushing image");
            run_or_report(&self.docker, &["push".to_string(), tag.clone()])
                .await
                .map_err(|f| task_failure(&id, f))?;
        } else {
            debug!(task = %id, tag = %tag, "push disabled; keeping image local");
        }

        Ok(VariantArtifact::new(&id, tag))
    }
}

impl TaskExecutor for DockerExecutor {
    fn run(&self, spec: BuildSpec) -> BoxFuture<'_, Result<VariantArtifact, TaskFailure>> {
        Box::pin(self.build(spec))
    }
}

fn task_failure(id: &TaskId, failure: CommandFailure) -> TaskFailure {
    TaskFailure::new(id.clone(), failure.message).with_log(failure.log)
}

/// Publishes a group as a multi-architecture manifest list.
#[derive(Debug, Clone)]
pub struct DockerPublisher {
    docker: String,
    registry: String,
}

impl DockerPublisher {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            docker: "docker".to_string(),
            registry: registry.into(),
        }
    }

    pub fn with_docker_binary(mut self, docker: impl Into<String>) -> Self {
        self.docker = docker.into();
        self
    }

    async fn push_manifest(
        &self,
        group: GroupId,
        artifacts: Vec<VariantArtifact>,
    ) -> Result<String, PublishFailure> {
        let latest = manifest_reference(&self.registry, &group);
        let fail =
            |f: CommandFailure| PublishFailure::new(group.clone(), f.message).with_log(f.log);

        // A stale local manifest list would make `create` fail.
        run_ignoring_failure(
            &self.docker,
            &["manifest".to_string(), "rm".to_string(), latest.clone()],
        )
        .await;

        info!(group = %group, manifest = %latest, variants = artifacts.len(), "creating manifest");
        let mut create = vec!["manifest".to_string(), "create".to_string(), latest.clone()];
        create.extend(artifacts.iter().map(|a| a.reference.clone()));
        run_or_report(&self.docker, &create).await.map_err(fail)?;

        info!(group = %group, manifest = %latest, "pushing manifest");
        run_or_report(
            &self.docker,
            &["manifest".to_string(), "push".to_string(), latest.clone()],
        )
        .await
        .map_err(fail)?;

        Ok(latest)
    }
}

impl Publisher for DockerPublisher {
    fn publish(
        &self,
        group: GroupId,
        artifacts: Vec<VariantArtifact>,
    ) -> BoxFuture<'_, Result<String, PublishFailure>> {
        Box::pin(self.push_manifest(group, artifacts))
    }
}
