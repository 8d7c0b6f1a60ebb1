//! Scripted collaborators for driving `wavebuild::engine::Driver` in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wavebuild::dag::BuildSpec;
use wavebuild::engine::{StatusEvent, StatusSink};
use wavebuild::errors::{PublishFailure, TaskFailure};
use wavebuild::exec::{BoxFuture, Publisher, TaskExecutor};
use wavebuild::types::{GroupId, TaskId, VariantArtifact};

/// A fake executor that:
/// - records which tasks were started, in order
/// - sleeps for a per-task (or default) delay
/// - fails, panics or misreports the tasks it was told to
/// - otherwise returns the artifact `test/<group>/<variant>`.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    calls: Mutex<Vec<TaskId>>,
    failing: HashSet<TaskId>,
    panicking: HashSet<TaskId>,
    misreport: HashSet<TaskId>,
    delays: HashMap<TaskId, Duration>,
    default_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, group: &str, variant: &str) -> Self {
        self.failing.insert(TaskId::new(group, variant));
        self
    }

    pub fn panic_on(mut self, group: &str, variant: &str) -> Self {
        self.panicking.insert(TaskId::new(group, variant));
        self
    }

    /// Return an artifact for a different variant than the one requested.
    pub fn misreport(mut self, group: &str, variant: &str) -> Self {
        self.misreport.insert(TaskId::new(group, variant));
        self
    }

    pub fn delay(mut self, group: &str, variant: &str, delay: Duration) -> Self {
        self.delays.insert(TaskId::new(group, variant), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Tasks in the order their builds started.
    pub fn calls(&self) -> Vec<TaskId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, group: &str, variant: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .contains(&TaskId::new(group, variant))
    }

    pub fn calls_for_group(&self, group: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.group == group)
            .count()
    }

    /// Highest number of builds observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl TaskExecutor for ScriptedExecutor {
    fn run(&self, spec: BuildSpec) -> BoxFuture<'_, Result<VariantArtifact, TaskFailure>> {
        Box::pin(async move {
            let id = spec.id;
            self.calls.lock().unwrap().push(id.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.get(&id).copied().unwrap_or(self.default_delay);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panicking.contains(&id) {
                panic!("scripted executor panic for {id}");
            }
            if self.failing.contains(&id) {
                return Err(TaskFailure::new(id, "scripted build failure"));
            }
            if self.misreport.contains(&id) {
                let other = TaskId::new(id.group.clone(), format!("{}-other", id.variant));
                return Ok(VariantArtifact::new(&other, format!("test/{other}")));
            }
            Ok(VariantArtifact::new(&id, format!("test/{id}")))
        })
    }
}

/// One call to [`RecordingPublisher::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub group: GroupId,
    pub artifacts: Vec<VariantArtifact>,
}

impl PublishCall {
    /// Variant names of the published artifacts, sorted.
    pub fn variants(&self) -> Vec<String> {
        let mut variants: Vec<String> =
            self.artifacts.iter().map(|a| a.variant.clone()).collect();
        variants.sort();
        variants
    }
}

/// A fake publisher that records every call and returns `<group>:latest`.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<PublishCall>>,
    failing: HashSet<GroupId>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, group: &str) -> Self {
        self.failing.insert(group.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Published groups in call order.
    pub fn groups(&self) -> Vec<GroupId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.group.clone())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(
        &self,
        group: GroupId,
        artifacts: Vec<VariantArtifact>,
    ) -> BoxFuture<'_, Result<String, PublishFailure>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(PublishCall {
                group: group.clone(),
                artifacts,
            });
            tokio::task::yield_now().await;

            if self.failing.contains(&group) {
                return Err(PublishFailure::new(group, "scripted publish failure"));
            }
            Ok(format!("{group}:latest"))
        })
    }
}

/// Collects every status event.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&StatusEvent) -> bool,
    {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl StatusSink for RecordingStatusSink {
    fn emit(&self, event: &StatusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
