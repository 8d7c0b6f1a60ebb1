#![allow(dead_code)]

use std::sync::Arc;

use wavebuild::config::PlanFile;
use wavebuild::dag::BuildPlan;
use wavebuild::engine::{Driver, RunOptions};
use wavebuild::types::TaskId;
use wavebuild_test_utils::builders::{GroupConfigBuilder, PlanFileBuilder};
use wavebuild_test_utils::fake_executor::{
    RecordingPublisher, RecordingStatusSink, ScriptedExecutor,
};

pub use wavebuild_test_utils::{init_tracing, with_timeout};

/// A driver wired to scripted collaborators the test can inspect afterwards.
pub struct Harness {
    pub driver: Driver,
    pub executor: Arc<ScriptedExecutor>,
    pub publisher: Arc<RecordingPublisher>,
    pub status: Arc<RecordingStatusSink>,
}

impl Harness {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        plan: &PlanFile,
        options: RunOptions,
        executor: ScriptedExecutor,
        publisher: RecordingPublisher,
    ) -> Self {
        init_tracing();

        let executor = executor.into_arc();
        let publisher = publisher.into_arc();
        let status = Arc::new(RecordingStatusSink::new());

        let driver = Driver::new(
            BuildPlan::from_plan(plan),
            options,
            executor.clone(),
            publisher.clone(),
            status.clone(),
        );

        Self {
            driver,
            executor,
            publisher,
            status,
        }
    }
}

pub fn options(max_parallelism: usize) -> RunOptions {
    RunOptions {
        max_parallelism,
        publish_enabled: true,
    }
}

pub fn task(group: &str, variant: &str) -> TaskId {
    TaskId::new(group, variant)
}

/// base -> builder -> final, two variants each.
pub fn three_wave_plan() -> PlanFile {
    PlanFileBuilder::new()
        .with_group("base", GroupConfigBuilder::new(&["amd64", "arm64"]).build())
        .with_group(
            "builder",
            GroupConfigBuilder::new(&["amd64", "arm64"]).from("base").build(),
        )
        .with_group(
            "final",
            GroupConfigBuilder::new(&["amd64", "arm64"]).from("builder").build(),
        )
        .build()
}

/// Position of `task` in `calls`, panicking if it never ran.
pub fn position(calls: &[TaskId], group: &str, variant: &str) -> usize {
    calls
        .iter()
        .position(|t| t.group == group && t.variant == variant)
        .unwrap_or_else(|| panic!("{group}/{variant} never ran; calls: {calls:?}"))
}
