// src/engine/driver.rs

//! Wave scheduler: submits build tasks, fires barriers, publishes groups and
//! unlocks dependent waves.
//!
//! All barriers are registered from the precomputed [`BuildPlan`] before the
//! first task is submitted. Reactions to a finished build (record, signal,
//! publish, dispatch continuations) run inside the job on its worker, so a
//! slow sibling never delays an unrelated group. The drain loop in
//! [`Driver::run`] only collects outcomes, in submission order, until no
//! submitted job is left.
//!
//! Lock discipline: the registry, the aggregator and the job ledger each have
//! their own mutex, none is held across an `.await`, and the only nesting is
//! ledger -> registry (in `submit_wave`).

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::dag::{
    Aggregator, BuildPlan, BuildSpec, CompletionRegistry, Continuation, FinalizationDecision,
};
use crate::engine::report::{PublishedGroup, RunFailure, RunReport};
use crate::engine::status::{StatusEvent, StatusSink};
use crate::engine::RunOptions;
use crate::errors::{violation, Result, TaskFailure, WavebuildError};
use crate::exec::pool::{CancelHandle, JobHandle, JobOutcome, Task, WorkerPool};
use crate::exec::{Publisher, TaskExecutor};
use crate::types::{GroupId, VariantArtifact};

/// How a job that ran to completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Built,
    /// Started after the run was aborted; the build was not attempted.
    SkippedAfterAbort,
}

type JobResult = Result<Settled>;

#[derive(Debug, Default)]
struct JobLedger {
    /// Submitted jobs not yet collected by the drain loop.
    pending: VecDeque<JobHandle<JobResult>>,
    /// Cancel handles of every job submitted so far.
    cancel: Vec<CancelHandle>,
}

struct Shared {
    plan: BuildPlan,
    options: RunOptions,
    registry: CompletionRegistry,
    aggregator: Aggregator,
    pool: WorkerPool,
    ledger: Mutex<JobLedger>,
    published: Mutex<Vec<PublishedGroup>>,
    executor: Arc<dyn TaskExecutor>,
    publisher: Arc<dyn Publisher>,
    status: Arc<dyn StatusSink>,
}

/// Runs a [`BuildPlan`] to completion or first failure.
pub struct Driver {
    shared: Arc<Shared>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("plan", &self.shared.plan)
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Create a driver and its worker pool. Must be called within a Tokio
    /// runtime.
    pub fn new(
        plan: BuildPlan,
        options: RunOptions,
        executor: Arc<dyn TaskExecutor>,
        publisher: Arc<dyn Publisher>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let pool = WorkerPool::new(options.max_parallelism);
        Self {
            shared: Arc::new(Shared {
                plan,
                options,
                registry: CompletionRegistry::new(),
                aggregator: Aggregator::new(),
                pool,
                ledger: Mutex::new(JobLedger::default()),
                published: Mutex::new(Vec::new()),
                executor,
                publisher,
                status,
            }),
        }
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.shared.registry
    }

    /// Artifacts recorded so far; the permanent record once the run ends.
    pub fn aggregator(&self) -> &Aggregator {
        &self.shared.aggregator
    }

    /// Execute the plan.
    ///
    /// Returns a report once every submitted job has been collected. Build
    /// and publish failures end up in [`RunReport::failures`]; a scheduling
    /// invariant breach is returned as [`WavebuildError::ProtocolViolation`].
    /// A driver can only run once.
    pub async fn run(&self) -> Result<RunReport> {
        let shared = &self.shared;
        info!(
            groups = shared.plan.len(),
            tasks = shared.plan.task_count(),
            max_parallelism = shared.pool.max_parallelism(),
            publish = shared.options.publish_enabled,
            "starting run"
        );

        shared.register_barriers()?;
        for root in shared.plan.roots() {
            shared.submit_wave(&root)?;
        }

        let mut report = RunReport::default();
        let mut protocol_violation: Option<WavebuildError> = None;

        while let Some(handle) = shared.next_pending() {
            let task = handle.id().clone();
            match handle.outcome().await {
                JobOutcome::Completed(Ok(Settled::Built)) => report.completed += 1,
                JobOutcome::Completed(Ok(Settled::SkippedAfterAbort)) | JobOutcome::Cancelled => {
                    shared.status.emit(&StatusEvent::TaskCancelled { task: task.clone() });
                    report.cancelled.push(task);
                }
                JobOutcome::Completed(Err(WavebuildError::TaskFailure(failure))) => {
                    report.failures.push(RunFailure::Task(failure));
                }
                JobOutcome::Completed(Err(WavebuildError::PublishFailure(failure))) => {
                    report.failures.push(RunFailure::Publish(failure));
                }
                JobOutcome::Completed(Err(err @ WavebuildError::ProtocolViolation(_))) => {
                    error!(task = %task, error = %err, "scheduling invariant violated");
                    shared.abort();
                    if protocol_violation.is_none() {
                        protocol_violation = Some(err);
                    }
                }
                JobOutcome::Completed(Err(err)) => {
                    error!(task = %task, error = %err, "task ended with unexpected error");
                    shared.abort();
                    report
                        .failures
                        .push(RunFailure::Task(TaskFailure::new(task, err.to_string())));
                }
                JobOutcome::Lost => {
                    error!(task = %task, "task lost; aborting run");
                    shared.abort();
                    report.failures.push(RunFailure::Lost(task));
                }
            }
        }

        if let Some(err) = protocol_violation {
            return Err(err);
        }

        report.published = std::mem::take(&mut *lock(&shared.published));
        if report.succeeded() {
            info!(
                completed = report.completed,
                published = report.published.len(),
                "all builds finished successfully"
            );
        } else {
            warn!(
                failures = report.failures.len(),
                cancelled = report.cancelled.len(),
                "run failed"
            );
        }
        Ok(report)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// One barrier per group, counting its variants, continued by the groups
    /// it unlocks. Single-variant groups that unlock nothing need no barrier:
    /// their one completion publishes them directly.
    fn register_barriers(&self) -> Result<()> {
        for node in self.plan.groups() {
            if node.dependents().is_empty() && node.variants.len() == 1 {
                debug!(group = %node.name, "single-variant leaf group; no barrier");
                continue;
            }

            let continuations = node
                .dependents()
                .iter()
                .map(Continuation::unlock)
                .collect();
            self.registry
                .register_barrier(node.name.clone(), node.variants.len(), continuations)?;
        }
        Ok(())
    }

    fn next_pending(&self) -> Option<JobHandle<JobResult>> {
        lock(&self.ledger).pending.pop_front()
    }

    /// Submit one task per variant of `group`, unless the run has failed.
    fn submit_wave(self: &Arc<Self>, group: &str) -> Result<()> {
        let node = self
            .plan
            .group(group)
            .ok_or_else(|| violation(format!("wave requested for unknown group '{group}'")))?;
        let specs = BuildSpec::wave_of(node);
        let count = specs.len();

        let mut ledger = lock(&self.ledger);
        // Checked under the ledger lock: `abort` takes the same lock after
        // flipping the flag, so every job queued here is seen by it.
        if self.registry.is_failed() {
            debug!(group = %group, "run aborted; not submitting wave");
            return Ok(());
        }

        let mut queued = Vec::with_capacity(count);
        for spec in specs {
            let id = spec.id.clone();
            queued.push(id.clone());

            let shared = Arc::clone(self);
            let handle = self
                .pool
                .submit(Task::new(id, move || shared.execute(spec)));
            ledger.cancel.push(handle.cancel_handle());
            ledger.pending.push_back(handle);
        }
        drop(ledger);

        for task in queued {
            self.status.emit(&StatusEvent::TaskQueued { task });
        }

        info!(group = %group, variants = count, "submitted wave");
        Ok(())
    }

    /// Job body: build one variant and react to the result.
    async fn execute(self: Arc<Self>, spec: BuildSpec) -> JobResult {
        let task = spec.id.clone();
        if self.registry.is_failed() {
            debug!(task = %task, "run already aborted; not starting build");
            return Ok(Settled::SkippedAfterAbort);
        }

        self.status.emit(&StatusEvent::TaskStarted { task: task.clone() });

        // Spawned so a panicking executor aborts the run here, not when the
        // drain loop eventually reaches this job.
        let executor = Arc::clone(&self.executor);
        let build = tokio::spawn(async move { executor.run(spec).await });
        let built = match build.await {
            Ok(result) => result,
            Err(err) => {
                error!(task = %task, error = %err, "build did not complete");
                Err(TaskFailure::new(task.clone(), format!("build did not complete: {err}")))
            }
        };

        let artifact = match built {
            Ok(artifact) => artifact,
            Err(failure) => {
                self.status.emit(&StatusEvent::TaskFailed {
                    task: failure.task.clone(),
                    message: failure.message.clone(),
                    log: failure.log.clone(),
                });
                self.abort();
                return Err(failure.into());
            }
        };

        if artifact.task_id() != task {
            self.abort();
            return Err(violation(format!(
                "executor returned an artifact for {} while building {task}",
                artifact.task_id()
            )));
        }

        self.status.emit(&StatusEvent::TaskSucceeded {
            task,
            reference: artifact.reference.clone(),
        });

        match self.on_success(artifact).await {
            Ok(()) => Ok(Settled::Built),
            Err(err) => {
                self.abort();
                Err(err)
            }
        }
    }

    async fn on_success(self: &Arc<Self>, artifact: VariantArtifact) -> Result<()> {
        let group = artifact.group.clone();
        self.aggregator.record(artifact.clone())?;

        match self.registry.signal(&group)? {
            FinalizationDecision::NotTracked => {
                self.publish(&group, vec![artifact]).await?;
            }
            FinalizationDecision::StillPending { remaining } => {
                debug!(group = %group, remaining, "waiting for sibling variants");
            }
            FinalizationDecision::Finalize { continuations } => {
                let artifacts = self.aggregator.snapshot_and_seal(&group)?;
                self.status.emit(&StatusEvent::GroupFinalized {
                    group: group.clone(),
                    artifacts: artifacts.len(),
                });
                self.publish(&group, artifacts).await?;

                for continuation in continuations {
                    if self.registry.is_failed() {
                        debug!(group = %group, "run aborted; dropping remaining continuations");
                        break;
                    }
                    self.status.emit(&StatusEvent::WaveUnlocked {
                        group: continuation.unlocks.clone(),
                        unlocked_by: group.clone(),
                    });
                    self.submit_wave(&continuation.unlocks)?;
                }
            }
            FinalizationDecision::Aborted => {
                debug!(group = %group, "run aborted; not acting on completion");
            }
        }
        Ok(())
    }

    async fn publish(&self, group: &GroupId, artifacts: Vec<VariantArtifact>) -> Result<()> {
        if self.registry.is_failed() {
            debug!(group = %group, "run aborted; skipping publish");
            return Ok(());
        }

        if !self.options.publish_enabled {
            self.status.emit(&StatusEvent::PublishSkipped { group: group.clone() });
            lock(&self.published).push(PublishedGroup {
                group: group.clone(),
                reference: None,
                artifacts,
            });
            return Ok(());
        }

        match self.publisher.publish(group.clone(), artifacts.clone()).await {
            Ok(reference) => {
                self.status.emit(&StatusEvent::Published {
                    group: group.clone(),
                    reference: reference.clone(),
                });
                lock(&self.published).push(PublishedGroup {
                    group: group.clone(),
                    reference: Some(reference),
                    artifacts,
                });
                Ok(())
            }
            Err(failure) => {
                self.status.emit(&StatusEvent::PublishFailed {
                    group: failure.group.clone(),
                    message: failure.message.clone(),
                    log: failure.log.clone(),
                });
                self.abort();
                Err(failure.into())
            }
        }
    }

    /// Flip the abort flag, drop pending continuations and cancel every job
    /// that has not started yet. Only the first call has any effect.
    fn abort(&self) {
        if !self.registry.abort() {
            return;
        }

        let handles = std::mem::take(&mut lock(&self.ledger).cancel);
        let cancelled = handles.iter().filter(|h| h.cancel()).count();
        self.status.emit(&StatusEvent::Aborted { cancelled });
    }
}
