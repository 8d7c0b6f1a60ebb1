// src/dag/barrier.rs

//! Per-group countdown barriers and the run-wide abort flag.
//!
//! Both live behind a single mutex so that "is the run still healthy?" and
//! "did this completion bring the group to zero?" are decided atomically.
//! The registry, not the caller, owns the decision of which `signal` call
//! finalizes a group, so any number of workers may signal concurrently.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::dag::task_info::Continuation;
use crate::errors::{violation, Result};
use crate::types::GroupId;

/// Countdown record for one group.
#[derive(Debug)]
struct Barrier {
    registered: usize,
    remaining: usize,
    finalized: bool,
    continuations: Vec<Continuation>,
}

/// What the caller of [`CompletionRegistry::signal`] must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizationDecision {
    /// No barrier was registered for the group: publish right away using the
    /// single artifact just recorded.
    NotTracked,
    /// Siblings are still outstanding.
    StillPending { remaining: usize },
    /// This call brought the barrier to zero. Publish the group, then run
    /// `continuations` in order. Handed out exactly once per group.
    Finalize { continuations: Vec<Continuation> },
    /// The run has been aborted; do not publish or schedule anything.
    Aborted,
}

#[derive(Debug, Default)]
struct RegistryState {
    failed: bool,
    barriers: HashMap<GroupId, Barrier>,
}

/// Barrier registry shared by the driver and every worker.
#[derive(Debug, Default)]
pub struct CompletionRegistry {
    state: Mutex<RegistryState>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Mutations never span a panic point; poisoned state is consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register the barrier for `group`.
    ///
    /// Must happen before any task of `group` can complete. Registering the
    /// same group twice, or with a zero count, is a protocol violation.
    pub fn register_barrier(
        &self,
        group: impl Into<GroupId>,
        count: usize,
        continuations: Vec<Continuation>,
    ) -> Result<()> {
        let group = group.into();
        if count == 0 {
            return Err(violation(format!(
                "barrier for group '{group}' registered with zero variants"
            )));
        }

        let mut state = self.lock();
        if state.barriers.contains_key(&group) {
            return Err(violation(format!(
                "barrier for group '{group}' registered twice"
            )));
        }

        debug!(
            group = %group,
            count,
            continuations = continuations.len(),
            "registered barrier"
        );
        state.barriers.insert(
            group,
            Barrier {
                registered: count,
                remaining: count,
                finalized: false,
                continuations,
            },
        );
        Ok(())
    }

    /// Record one completed variant of `group`.
    pub fn signal(&self, group: &str) -> Result<FinalizationDecision> {
        let mut state = self.lock();

        if state.failed {
            debug!(group = %group, "signal after abort; ignoring");
            return Ok(FinalizationDecision::Aborted);
        }

        let Some(barrier) = state.barriers.get_mut(group) else {
            return Ok(FinalizationDecision::NotTracked);
        };

        if barrier.finalized || barrier.remaining == 0 {
            return Err(violation(format!(
                "group '{group}' signalled more than its {} registered variants",
                barrier.registered
            )));
        }

        barrier.remaining -= 1;
        if barrier.remaining > 0 {
            return Ok(FinalizationDecision::StillPending {
                remaining: barrier.remaining,
            });
        }

        barrier.finalized = true;
        let continuations = std::mem::take(&mut barrier.continuations);
        debug!(
            group = %group,
            continuations = continuations.len(),
            "barrier reached zero"
        );
        Ok(FinalizationDecision::Finalize { continuations })
    }

    /// Flip the abort flag and drop every pending continuation.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn abort(&self) -> bool {
        let mut state = self.lock();
        if state.failed {
            return false;
        }

        state.failed = true;
        let mut dropped = 0;
        for barrier in state.barriers.values_mut() {
            dropped += barrier.continuations.len();
            barrier.continuations.clear();
        }
        warn!(dropped_continuations = dropped, "run aborted");
        true
    }

    pub fn is_failed(&self) -> bool {
        self.lock().failed
    }

    /// Outstanding variant count of `group`, if a barrier exists.
    pub fn remaining(&self, group: &str) -> Option<usize> {
        self.lock().barriers.get(group).map(|b| b.remaining)
    }

    pub fn is_finalized(&self, group: &str) -> bool {
        self.lock()
            .barriers
            .get(group)
            .is_some_and(|b| b.finalized)
    }
}
