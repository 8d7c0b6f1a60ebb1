// src/dag/graph.rs

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::model::PlanFile;
use crate::errors::{Result, WavebuildError};
use crate::types::{GroupId, Selection, VariantId};

/// One group of the plan with its precomputed dependency edges.
#[derive(Debug, Clone)]
pub struct GroupNode {
    pub name: GroupId,
    pub variants: Vec<VariantId>,
    /// Parent group this one builds on, if any.
    pub from: Option<GroupId>,
    pub dockerfile: String,
    /// Groups unlocked when this one is finalized.
    dependents: Vec<GroupId>,
}

impl GroupNode {
    pub fn dependents(&self) -> &[GroupId] {
        &self.dependents
    }
}

/// In-memory DAG of groups, keyed by group name.
///
/// Acyclicity is validated in `config::validate`; here we only keep the
/// adjacency needed to register barriers and dispatch waves.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    nodes: BTreeMap<GroupId, GroupNode>,
}

impl BuildPlan {
    /// Build the full plan from a validated [`PlanFile`].
    pub fn from_plan(plan: &PlanFile) -> Self {
        let nodes = plan
            .groups()
            .iter()
            .map(|(name, group)| {
                (
                    name.clone(),
                    GroupNode {
                        name: name.clone(),
                        variants: group.variants.clone(),
                        from: group.from.clone(),
                        dockerfile: group.dockerfile.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        Self::link(nodes)
    }

    /// Populate `dependents` from each node's `from` edge.
    ///
    /// A `from` pointing outside the node set is treated as already
    /// available, which makes that node a root.
    fn link(mut nodes: BTreeMap<GroupId, GroupNode>) -> Self {
        for node in nodes.values_mut() {
            node.dependents.clear();
        }

        let edges: Vec<(GroupId, GroupId)> = nodes
            .values()
            .filter_map(|n| n.from.clone().map(|parent| (parent, n.name.clone())))
            .collect();

        for (parent, child) in edges {
            if let Some(parent_node) = nodes.get_mut(&parent) {
                parent_node.dependents.push(child);
            }
        }

        Self { nodes }
    }

    /// Restrict the plan to `selection.group` and its transitive dependents.
    ///
    /// With a variant, every kept group is narrowed to that variant; groups
    /// that do not build it are dropped together with their dependents.
    pub fn select(&self, selection: &Selection) -> Result<BuildPlan> {
        let root = self
            .nodes
            .get(&selection.group)
            .ok_or_else(|| WavebuildError::GroupNotFound(selection.group.clone()))?;

        let builds_variant = |node: &GroupNode| match &selection.variant {
            Some(v) => node.variants.iter().any(|nv| nv == v),
            None => true,
        };

        if !builds_variant(root) {
            return Err(WavebuildError::ConfigError(format!(
                "group '{}' does not build variant '{}'",
                root.name,
                selection.variant.as_deref().unwrap_or_default()
            )));
        }

        let mut kept: BTreeMap<GroupId, GroupNode> = BTreeMap::new();
        let mut stack: Vec<&GroupNode> = vec![root];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.name.as_str()) {
                continue;
            }

            let mut narrowed = node.clone();
            if let Some(v) = &selection.variant {
                narrowed.variants.retain(|nv| nv == v);
            }
            kept.insert(node.name.clone(), narrowed);

            for child in node.dependents.iter() {
                match self.nodes.get(child) {
                    Some(child_node) if builds_variant(child_node) => stack.push(child_node),
                    Some(_) => {
                        debug!(group = %child, "dropping group without selected variant");
                    }
                    None => {}
                }
            }
        }

        Ok(Self::link(kept))
    }

    pub fn group(&self, name: &str) -> Option<&GroupNode> {
        self.nodes.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependents of a group (groups whose `from` is this one).
    pub fn dependents_of(&self, name: &str) -> &[GroupId] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Groups whose wave is submitted at run start.
    pub fn roots(&self) -> Vec<GroupId> {
        self.nodes
            .values()
            .filter(|n| match &n.from {
                Some(parent) => !self.nodes.contains_key(parent),
                None => true,
            })
            .map(|n| n.name.clone())
            .collect()
    }

    /// Total number of build tasks across all groups.
    pub fn task_count(&self) -> usize {
        self.nodes.values().map(|n| n.variants.len()).sum()
    }

    /// Groups arranged by wave depth: roots first, then the groups they
    /// unlock, and so on.
    pub fn waves(&self) -> Vec<Vec<GroupId>> {
        let mut waves = Vec::new();
        let mut current = self.roots();

        while !current.is_empty() {
            let mut next: Vec<GroupId> = current
                .iter()
                .flat_map(|g| self.dependents_of(g).iter().cloned())
                .collect();
            next.sort();
            waves.push(current);
            current = next;
        }

        waves
    }
}
