// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{GroupId, VariantId};

/// Build plan exactly as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// max_parallelism = 2
/// registry = "registry.example.org/ci-"
///
/// [group.debian-stable-base]
/// variants = ["amd64", "arm64v8"]
/// dockerfile = "FROM {variant}/debian:stable\n"
///
/// [group.debian-stable-builder]
/// from = "debian-stable-base"
/// variants = ["amd64", "arm64v8"]
/// dockerfile = "FROM {registry}debian-stable-base/{variant}\n"
/// ```
///
/// Use `PlanFile::try_from(raw)` to obtain a validated plan.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    /// Global run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All groups from `[group.<name>]`, keyed by group name.
    #[serde(default)]
    pub group: BTreeMap<GroupId, GroupConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of build tasks running at once.
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,

    /// Push per-variant images and publish group manifests.
    #[serde(default = "default_publish")]
    pub publish: bool,

    /// Prefix prepended to every image reference.
    #[serde(default)]
    pub registry: String,

    /// Ignore the build tool's layer cache.
    #[serde(default)]
    pub no_cache: bool,
}

fn default_max_parallelism() -> usize {
    1
}

fn default_publish() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_parallelism: default_max_parallelism(),
            publish: default_publish(),
            registry: String::new(),
            no_cache: false,
        }
    }
}

/// `[group.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Variants (architectures) built for this group.
    pub variants: Vec<VariantId>,

    /// Group whose published artifact this group builds on. The group's wave
    /// is only submitted once that group has been finalized.
    #[serde(default)]
    pub from: Option<GroupId>,

    /// Build instructions; `{registry}`, `{group}` and `{variant}` are
    /// expanded per task.
    #[serde(default)]
    pub dockerfile: String,
}

/// A validated build plan.
///
/// Only obtainable through `TryFrom<RawPlanFile>` (see `config::validate`),
/// so holders may rely on: at least one group, known and acyclic `from`
/// references, non-empty and unique variants, `max_parallelism >= 1`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    config: ConfigSection,
    groups: BTreeMap<GroupId, GroupConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        groups: BTreeMap<GroupId, GroupConfig>,
    ) -> Self {
        Self { config, groups }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn groups(&self) -> &BTreeMap<GroupId, GroupConfig> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.get(name)
    }
}
