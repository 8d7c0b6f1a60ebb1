// src/dag/aggregator.rs

//! Per-group collection of the artifacts produced so far.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::errors::{violation, Result};
use crate::types::{GroupId, VariantArtifact};

#[derive(Debug, Default)]
struct Entry {
    artifacts: Vec<VariantArtifact>,
    /// Set by the one snapshot taken at finalization; read-only afterwards.
    sealed: bool,
}

/// Collects, per group, the artifacts of completed variants.
///
/// Guarded by its own lock, separate from the barrier registry, so recording
/// an artifact never waits on barrier bookkeeping and vice versa.
#[derive(Debug, Default)]
pub struct Aggregator {
    entries: Mutex<HashMap<GroupId, Entry>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GroupId, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `artifact` to its group's entry.
    ///
    /// Recording into a sealed group, or the same variant twice, is a
    /// protocol violation.
    pub fn record(&self, artifact: VariantArtifact) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries.entry(artifact.group.clone()).or_default();

        if entry.sealed {
            return Err(violation(format!(
                "artifact {} recorded after group '{}' was finalized",
                artifact.reference, artifact.group
            )));
        }
        if entry.artifacts.iter().any(|a| a.variant == artifact.variant) {
            return Err(violation(format!(
                "variant '{}' of group '{}' recorded twice",
                artifact.variant, artifact.group
            )));
        }

        debug!(
            group = %artifact.group,
            variant = %artifact.variant,
            reference = %artifact.reference,
            "recorded artifact"
        );
        entry.artifacts.push(artifact);
        Ok(())
    }

    /// Take the full artifact list of `group` for publishing and seal the
    /// entry. The entry stays readable through [`Aggregator::artifacts`].
    ///
    /// Called exactly once per group; a second call is a protocol violation.
    pub fn snapshot_and_seal(&self, group: &str) -> Result<Vec<VariantArtifact>> {
        let mut entries = self.lock();
        let entry = entries.entry(group.to_string()).or_default();

        if entry.sealed {
            return Err(violation(format!(
                "group '{group}' snapshotted more than once"
            )));
        }

        entry.sealed = true;
        Ok(entry.artifacts.clone())
    }

    /// Current (or, once sealed, permanent) artifact list of `group`.
    pub fn artifacts(&self, group: &str) -> Vec<VariantArtifact> {
        self.lock()
            .get(group)
            .map(|e| e.artifacts.clone())
            .unwrap_or_default()
    }

    pub fn is_sealed(&self, group: &str) -> bool {
        self.lock().get(group).is_some_and(|e| e.sealed)
    }
}
