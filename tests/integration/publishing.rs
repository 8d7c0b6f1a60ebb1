// tests/integration/publishing.rs

use std::error::Error;

use wavebuild::engine::{RunFailure, RunOptions, StatusEvent};
use wavebuild_test_utils::fake_executor::{RecordingPublisher, ScriptedExecutor};

use crate::common::{options, three_wave_plan, with_timeout, Harness};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn publish_failure_aborts_the_run() -> TestResult {
    let h = Harness::new(
        &three_wave_plan(),
        options(1),
        ScriptedExecutor::new(),
        RecordingPublisher::new().fail("base"),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert!(!report.succeeded());
    assert_eq!(h.publisher.groups(), vec!["base"]);
    assert_eq!(h.executor.calls_for_group("builder"), 0);
    assert!(report.published.is_empty());
    assert!(h.driver.registry().is_failed());

    match report.failures.as_slice() {
        [RunFailure::Publish(failure)] => assert_eq!(failure.group, "base"),
        other => panic!("expected one publish failure, got {other:?}"),
    }

    let failed = h
        .status
        .count(|e| matches!(e, StatusEvent::PublishFailed { group, .. } if group == "base"));
    assert_eq!(failed, 1);
    Ok(())
}

#[tokio::test]
async fn disabled_publishing_still_unlocks_dependents() -> TestResult {
    let h = Harness::new(
        &three_wave_plan(),
        RunOptions {
            max_parallelism: 2,
            publish_enabled: false,
        },
        ScriptedExecutor::new(),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    assert!(report.succeeded());
    assert!(h.publisher.calls().is_empty());
    assert_eq!(report.completed, 6);

    let groups: Vec<_> = report.published.iter().map(|p| p.group.as_str()).collect();
    assert_eq!(groups, vec!["base", "builder", "final"]);
    for published in &report.published {
        assert_eq!(published.reference, None);
        assert_eq!(published.artifacts.len(), 2);
    }

    let skipped = h
        .status
        .count(|e| matches!(e, StatusEvent::PublishSkipped { .. }));
    assert_eq!(skipped, 3);
    Ok(())
}

#[tokio::test]
async fn published_reference_is_reported_per_group() -> TestResult {
    let h = Harness::new(
        &three_wave_plan(),
        options(1),
        ScriptedExecutor::new(),
        RecordingPublisher::new(),
    );

    let report = with_timeout(h.driver.run()).await?;

    let builder = report
        .published_group("builder")
        .ok_or("builder not published")?;
    assert_eq!(builder.reference.as_deref(), Some("builder:latest"));

    let mut refs: Vec<_> = builder.artifacts.iter().map(|a| a.reference.as_str()).collect();
    refs.sort();
    assert_eq!(refs, vec!["test/builder/amd64", "test/builder/arm64"]);
    Ok(())
}
