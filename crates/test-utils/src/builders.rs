use std::collections::BTreeMap;

use wavebuild::config::{ConfigSection, GroupConfig, PlanFile, RawPlanFile};
use wavebuild::errors::Result;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ConfigSection::default(),
                group: BTreeMap::new(),
            },
        }
    }

    pub fn with_group(mut self, name: &str, group: GroupConfig) -> Self {
        self.plan.group.insert(name.to_string(), group);
        self
    }

    pub fn max_parallelism(mut self, n: usize) -> Self {
        self.plan.config.max_parallelism = n;
        self
    }

    pub fn publish(mut self, val: bool) -> Self {
        self.plan.config.publish = val;
        self
    }

    pub fn registry(mut self, prefix: &str) -> Self {
        self.plan.config.registry = prefix.to_string();
        self
    }

    /// Validate without panicking, for tests that expect a rejection.
    pub fn try_build(self) -> Result<PlanFile> {
        PlanFile::try_from(self.plan)
    }

    pub fn build(self) -> PlanFile {
        self.try_build()
            .expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `GroupConfig`.
pub struct GroupConfigBuilder {
    group: GroupConfig,
}

impl GroupConfigBuilder {
    pub fn new(variants: &[&str]) -> Self {
        Self {
            group: GroupConfig {
                variants: variants.iter().map(|v| v.to_string()).collect(),
                from: None,
                dockerfile: "FROM {variant}/scratch\n".to_string(),
            },
        }
    }

    pub fn from(mut self, parent: &str) -> Self {
        self.group.from = Some(parent.to_string());
        self
    }

    pub fn dockerfile(mut self, contents: &str) -> Self {
        self.group.dockerfile = contents.to_string();
        self
    }

    pub fn build(self) -> GroupConfig {
        self.group
    }
}
