// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{Result, WavebuildError};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = WavebuildError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.group))
    }
}

/// Run semantic validation against a raw plan.
///
/// This checks:
/// - there is at least one group
/// - `max_parallelism >= 1`
/// - every group has at least one variant, with no empty or duplicate names
/// - every `from` refers to another existing group
/// - the group graph has no cycles
pub fn validate_raw_plan(cfg: &RawPlanFile) -> Result<()> {
    ensure_has_groups(cfg)?;
    validate_global_config(cfg)?;
    validate_variants(cfg)?;
    validate_group_parents(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_groups(cfg: &RawPlanFile) -> Result<()> {
    if cfg.group.is_empty() {
        return Err(WavebuildError::ConfigError(
            "plan must contain at least one [group.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawPlanFile) -> Result<()> {
    if cfg.config.max_parallelism == 0 {
        return Err(WavebuildError::ConfigError(
            "[config].max_parallelism must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_variants(cfg: &RawPlanFile) -> Result<()> {
    for (name, group) in cfg.group.iter() {
        if group.variants.is_empty() {
            return Err(WavebuildError::ConfigError(format!(
                "group '{}' must list at least one variant",
                name
            )));
        }

        let mut seen = HashSet::new();
        for variant in group.variants.iter() {
            if variant.trim().is_empty() || variant.contains('/') {
                return Err(WavebuildError::ConfigError(format!(
                    "group '{}' has invalid variant name '{}'",
                    name, variant
                )));
            }
            if !seen.insert(variant.as_str()) {
                return Err(WavebuildError::ConfigError(format!(
                    "group '{}' lists variant '{}' more than once",
                    name, variant
                )));
            }
        }
    }
    Ok(())
}

fn validate_group_parents(cfg: &RawPlanFile) -> Result<()> {
    for (name, group) in cfg.group.iter() {
        if let Some(parent) = &group.from {
            if parent == name {
                return Err(WavebuildError::ConfigError(format!(
                    "group '{}' cannot build from itself",
                    name
                )));
            }
            if !cfg.group.contains_key(parent) {
                return Err(WavebuildError::ConfigError(format!(
                    "group '{}' has unknown parent '{}' in `from`",
                    name, parent
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawPlanFile) -> Result<()> {
    // Edge direction: parent -> group.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.group.keys() {
        graph.add_node(name.as_str());
    }

    for (name, group) in cfg.group.iter() {
        if let Some(parent) = &group.from {
            graph.add_edge(parent.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(WavebuildError::DagCycle(format!(
                "cycle detected in group graph involving group '{}'",
                node
            )))
        }
    }
}
