// tests/integration/failures.rs

use std::error::Error;
use std::time::Duration;

use wavebuild::engine::{RunFailure, StatusEvent};
use wavebuild::errors::WavebuildError;
use wavebuild_test_utils::builders::{GroupConfigBuilder, PlanFileBuilder};
use wavebuild_test_utils::fake_executor::{RecordingPublisher, ScriptedExecutor};

use crate::common::{options, task, three_wave_plan, with_timeout, Harness};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn failure_in_first_wave_stops_the_cascade() -> TestResult {
    let h = Harness::new(
        &three_wave_plan(),
        options(1),
        ScriptedExecutor::new().fail("base", "arm64"),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert!(!report.succeeded());
    assert_eq!(
        h.executor.calls(),
        vec![task("base", "amd64"), task("base", "arm64")]
    );
    assert_eq!(h.executor.calls_for_group("builder"), 0);
    assert_eq!(h.executor.calls_for_group("final"), 0);
    assert!(h.publisher.calls().is_empty());
    assert!(report.published.is_empty());
    assert!(h.driver.registry().is_failed());

    match report.failures.as_slice() {
        [RunFailure::Task(failure)] => assert_eq!(failure.task, task("base", "arm64")),
        other => panic!("expected one task failure, got {other:?}"),
    }

    match report.into_result() {
        Err(WavebuildError::RunFailed(msg)) => assert!(msg.contains("base/arm64"), "{msg}"),
        other => panic!("expected RunFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn failure_cancels_queued_siblings() -> TestResult {
    let plan = PlanFileBuilder::new()
        .with_group("wide", GroupConfigBuilder::new(&["v0", "v1", "v2", "v3"]).build())
        .build();

    let h = Harness::new(
        &plan,
        options(1),
        ScriptedExecutor::new().fail("wide", "v0"),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert_eq!(h.executor.calls(), vec![task("wide", "v0")]);
    assert!(h.publisher.calls().is_empty());
    assert_eq!(
        report.cancelled,
        vec![task("wide", "v1"), task("wide", "v2"), task("wide", "v3")]
    );
    assert_eq!(report.completed, 0);
    assert_eq!(h.driver.registry().remaining("wide"), Some(4));

    let aborted: Vec<_> = h
        .status
        .events()
        .into_iter()
        .filter(|e| matches!(e, StatusEvent::Aborted { .. }))
        .collect();
    assert_eq!(aborted, vec![StatusEvent::Aborted { cancelled: 3 }]);
    Ok(())
}

#[tokio::test]
async fn success_after_abort_never_publishes() -> TestResult {
    // amd64 is still building when arm64 fails; its completion must not
    // finalize the group.
    let h = Harness::new(
        &three_wave_plan(),
        options(2),
        ScriptedExecutor::new()
            .delay("base", "amd64", Duration::from_millis(100))
            .fail("base", "arm64"),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert!(!report.succeeded());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.completed, 1);
    assert!(h.publisher.calls().is_empty());
    assert!(!h.driver.registry().is_finalized("base"));
    assert!(!h.driver.aggregator().is_sealed("base"));
    assert_eq!(h.executor.calls_for_group("builder"), 0);
    Ok(())
}

#[tokio::test]
async fn failure_in_one_group_stops_unrelated_groups() -> TestResult {
    let plan = PlanFileBuilder::new()
        .with_group("broken", GroupConfigBuilder::new(&["amd64"]).build())
        .with_group("healthy", GroupConfigBuilder::new(&["amd64", "arm64"]).build())
        .with_group(
            "healthy-child",
            GroupConfigBuilder::new(&["amd64"]).from("healthy").build(),
        )
        .build();

    let h = Harness::new(
        &plan,
        options(1),
        ScriptedExecutor::new().fail("broken", "amd64"),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert_eq!(h.executor.calls(), vec![task("broken", "amd64")]);
    assert_eq!(
        report.cancelled,
        vec![task("healthy", "amd64"), task("healthy", "arm64")]
    );
    assert_eq!(h.executor.calls_for_group("healthy-child"), 0);
    assert!(h.publisher.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn executor_panic_aborts_before_other_waves_unlock() -> TestResult {
    // `a-slow` sits ahead of the panicking job in the drain order; the abort
    // must not wait for it.
    let plan = PlanFileBuilder::new()
        .with_group("a-slow", GroupConfigBuilder::new(&["amd64"]).build())
        .with_group("b-panic", GroupConfigBuilder::new(&["amd64"]).build())
        .with_group("c-other", GroupConfigBuilder::new(&["amd64", "arm64"]).build())
        .with_group(
            "d-child",
            GroupConfigBuilder::new(&["amd64"]).from("c-other").build(),
        )
        .build();

    let h = Harness::new(
        &plan,
        options(4),
        ScriptedExecutor::new()
            .delay("a-slow", "amd64", Duration::from_millis(300))
            .delay("c-other", "amd64", Duration::from_millis(20))
            .delay("c-other", "arm64", Duration::from_millis(20))
            .panic_on("b-panic", "amd64"),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert!(!report.succeeded());
    assert!(h.publisher.calls().is_empty(), "published: {:?}", h.publisher.groups());
    assert_eq!(h.executor.calls_for_group("d-child"), 0);
    assert!(!h.driver.registry().is_finalized("c-other"));

    match report.failures.as_slice() {
        [RunFailure::Task(failure)] => {
            assert_eq!(failure.task, task("b-panic", "amd64"));
            assert!(failure.message.contains("panicked"), "{}", failure.message);
        }
        other => panic!("expected one task failure, got {other:?}"),
    }

    let failed = h.status.count(|e| {
        matches!(e, StatusEvent::TaskFailed { task, .. } if task.group == "b-panic")
    });
    assert_eq!(failed, 1);
    Ok(())
}

#[tokio::test]
async fn mismatched_artifact_is_a_protocol_violation() -> TestResult {
    let h = Harness::new(
        &three_wave_plan(),
        options(1),
        ScriptedExecutor::new().misreport("base", "arm64"),
        RecordingPublisher::new(),
    );

    let result = with_timeout(h.driver.run()).await;

    match result {
        Err(WavebuildError::ProtocolViolation(msg)) => assert!(msg.contains("base/arm64"), "{msg}"),
        other => panic!("expected ProtocolViolation, got {other:?}"),
    }
    assert!(h.publisher.calls().is_empty());
    assert_eq!(h.executor.calls_for_group("builder"), 0);
    Ok(())
}
