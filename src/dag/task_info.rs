// src/dag/task_info.rs

//! Build task descriptions handed to the executor.

use crate::dag::graph::GroupNode;
use crate::types::{GroupId, TaskId};

/// Description of one variant build the driver wants the executor to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub id: TaskId,
    /// Unexpanded build instructions of the owning group.
    pub dockerfile: String,
}

impl BuildSpec {
    pub fn new(id: TaskId, dockerfile: impl Into<String>) -> Self {
        Self {
            id,
            dockerfile: dockerfile.into(),
        }
    }

    /// One spec per variant of `node`, in declaration order.
    pub fn wave_of(node: &GroupNode) -> Vec<BuildSpec> {
        node.variants
            .iter()
            .map(|variant| {
                BuildSpec::new(
                    TaskId::new(node.name.clone(), variant.clone()),
                    node.dockerfile.clone(),
                )
            })
            .collect()
    }
}

/// Work to perform once a barrier fires: submit the wave of `unlocks`.
///
/// Kept as plain data so the driver, not a captured closure, decides how the
/// wave is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub unlocks: GroupId,
}

impl Continuation {
    pub fn unlock(group: impl Into<GroupId>) -> Self {
        Self {
            unlocks: group.into(),
        }
    }
}
