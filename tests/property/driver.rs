// tests/property/driver.rs

use proptest::prelude::*;
use wavebuild::config::PlanFile;
use wavebuild::engine::StatusEvent;
use wavebuild_test_utils::builders::{GroupConfigBuilder, PlanFileBuilder};
use wavebuild_test_utils::fake_executor::{RecordingPublisher, ScriptedExecutor};

use crate::common::{options, Harness};

const ARCHES: [&str; 4] = ["amd64", "arm64v8", "i386", "ppc64le"];

// Strategy for a random build forest. Acyclic by construction: group N may
// only build from a group 0..N-1.
fn forest_strategy(max_groups: usize) -> impl Strategy<Value = PlanFile> {
    (1..=max_groups).prop_flat_map(|num_groups| {
        proptest::collection::vec((any::<Option<usize>>(), 1..=ARCHES.len()), num_groups)
            .prop_map(|groups| {
                let mut builder = PlanFileBuilder::new();
                for (i, (parent, variants)) in groups.into_iter().enumerate() {
                    let mut group = GroupConfigBuilder::new(&ARCHES[..variants]);
                    if let (Some(p), true) = (parent, i > 0) {
                        group = group.from(&format!("g{}", p % i));
                    }
                    builder = builder.with_group(&format!("g{i}"), group.build());
                }
                builder.build()
            })
    })
}

fn index_of(events: &[StatusEvent], pred: impl Fn(&StatusEvent) -> bool) -> Option<usize> {
    events.iter().position(pred)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_group_publishes_once_and_after_its_parent(
        plan in forest_strategy(7),
        parallelism in 1usize..5,
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let (report, events, published, calls) = rt.block_on(async {
            let h = Harness::new(
                &plan,
                options(parallelism),
                ScriptedExecutor::new(),
                RecordingPublisher::new(),
            );
            let report = crate::common::with_timeout(h.driver.run()).await.unwrap();
            (report, h.status.events(), h.publisher.groups(), h.executor.calls())
        });

        prop_assert!(report.succeeded());
        let task_count: usize = plan.groups().values().map(|g| g.variants.len()).sum();
        prop_assert_eq!(report.completed, task_count);
        prop_assert_eq!(calls.len(), task_count);

        for (name, group) in plan.groups() {
            prop_assert_eq!(published.iter().filter(|g| *g == name).count(), 1);

            let Some(parent) = &group.from else { continue };
            let parent_published = index_of(&events, |e| {
                matches!(e, StatusEvent::Published { group, .. } if group == parent)
            });
            let first_started = index_of(&events, |e| {
                matches!(e, StatusEvent::TaskStarted { task } if &task.group == name)
            });
            prop_assert!(parent_published.is_some() && first_started.is_some());
            prop_assert!(
                parent_published < first_started,
                "{} started before {} was published",
                name,
                parent
            );
        }
    }
}
