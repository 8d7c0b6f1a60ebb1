use std::fmt;
use std::str::FromStr;

/// Logical name of an artifact family, e.g. `debian-stable-base`.
pub type GroupId = String;

/// One concrete unit of work inside a group, e.g. `amd64`.
pub type VariantId = String;

/// Identity of a single build task: one variant of one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub group: GroupId,
    pub variant: VariantId,
}

impl TaskId {
    pub fn new(group: impl Into<GroupId>, variant: impl Into<VariantId>) -> Self {
        Self {
            group: group.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.variant)
    }
}

/// Result of a successful build task: the per-variant reference that was
/// produced (and pushed, when publishing is enabled).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantArtifact {
    pub group: GroupId,
    pub variant: VariantId,
    pub reference: String,
}

impl VariantArtifact {
    pub fn new(task: &TaskId, reference: impl Into<String>) -> Self {
        Self {
            group: task.group.clone(),
            variant: task.variant.clone(),
            reference: reference.into(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        TaskId::new(self.group.clone(), self.variant.clone())
    }
}

/// Restricts a run to a subtree of the build plan.
///
/// Parsed from `GROUP` or `GROUP/VARIANT` (e.g. `debian-sid/amd64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub group: GroupId,
    pub variant: Option<VariantId>,
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (group, variant) = match s.split_once('/') {
            Some((group, variant)) => (group, Some(variant)),
            None => (s, None),
        };

        if group.is_empty() {
            return Err(format!(
                "invalid selection '{s}' (expected GROUP or GROUP/VARIANT)"
            ));
        }

        let variant = match variant {
            Some(v) if v.is_empty() || v.contains('/') => {
                return Err(format!(
                    "invalid selection '{s}' (expected GROUP or GROUP/VARIANT)"
                ));
            }
            Some(v) => Some(v.to_string()),
            None => None,
        };

        Ok(Selection {
            group: group.to_string(),
            variant,
        })
    }
}
