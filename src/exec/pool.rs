// src/exec/pool.rs

//! Bounded-concurrency worker pool.
//!
//! A fixed number of worker loops pull jobs from one FIFO channel, so jobs
//! start in submission order and at most `max_parallelism` run at once. Each
//! job carries a small state word (queued / running / cancelled); whichever
//! side flips it first wins, which is what makes cancellation of a
//! not-yet-started job race-free.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::types::TaskId;

/// Boxed future produced by a task payload.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// A unit of work: identity plus an opaque payload, consumed exactly once.
///
/// The payload closure is only invoked when a worker actually starts the
/// job, so a cancelled task never runs any of its code.
pub struct Task<T> {
    id: TaskId,
    payload: Box<dyn FnOnce() -> TaskFuture<T> + Send>,
}

impl<T> Task<T> {
    pub fn new<F, Fut>(id: TaskId, payload: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            id,
            payload: Box::new(move || Box::pin(payload())),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle that can prevent a queued job from starting.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: TaskId,
    state: Arc<AtomicU8>,
}

impl CancelHandle {
    /// Cancel the job if it has not started yet.
    ///
    /// Returns `true` if the job will never run. Cancelling a job that is
    /// already running (or finished) has no effect and returns `false`.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }
}

/// Final state of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    /// The payload ran to completion.
    Completed(T),
    /// The job was cancelled before it started.
    Cancelled,
    /// The payload panicked or the pool shut down underneath it.
    Lost,
}

/// Handle to a submitted job's eventual outcome.
#[derive(Debug)]
pub struct JobHandle<T> {
    cancel: CancelHandle,
    result_rx: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    pub fn id(&self) -> &TaskId {
        self.cancel.id()
    }

    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the job to finish, be skipped, or be lost.
    pub async fn outcome(self) -> JobOutcome<T> {
        match self.result_rx.await {
            Ok(value) => JobOutcome::Completed(value),
            Err(_) if self.cancel.is_cancelled() => JobOutcome::Cancelled,
            Err(_) => JobOutcome::Lost,
        }
    }
}

type ErasedJob = Box<dyn FnOnce() -> TaskFuture<()> + Send>;

struct QueuedJob {
    id: TaskId,
    state: Arc<AtomicU8>,
    run: ErasedJob,
}

/// Fixed-size pool of worker loops.
///
/// Must be created from within a Tokio runtime. Dropping the pool lets the
/// workers finish the jobs already queued and then exit.
#[derive(Debug)]
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<QueuedJob>,
    max_parallelism: usize,
}

impl WorkerPool {
    /// Spawn `max_parallelism` workers (values below 1 are raised to 1).
    pub fn new(max_parallelism: usize) -> Self {
        let max_parallelism = max_parallelism.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<QueuedJob>();
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..max_parallelism {
            let rx = Arc::clone(&rx);
            tokio::spawn(worker_loop(worker, rx));
        }

        info!(max_parallelism, "worker pool started");
        Self { tx, max_parallelism }
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Queue `task` and return a handle to its outcome.
    pub fn submit<T: Send + 'static>(&self, task: Task<T>) -> JobHandle<T> {
        let Task { id, payload } = task;
        let (result_tx, result_rx) = oneshot::channel::<T>();
        let state = Arc::new(AtomicU8::new(QUEUED));

        let run: ErasedJob = Box::new(move || {
            Box::pin(async move {
                let value = payload().await;
                // The handle may have been dropped; nobody is waiting then.
                let _ = result_tx.send(value);
            })
        });

        let job = QueuedJob {
            id: id.clone(),
            state: Arc::clone(&state),
            run,
        };

        if self.tx.send(job).is_err() {
            warn!(task = %id, "worker pool closed; job dropped");
        } else {
            debug!(task = %id, "job queued");
        }

        JobHandle {
            cancel: CancelHandle { id, state },
            result_rx,
        }
    }
}

async fn worker_loop(worker: usize, rx: Arc<Mutex<mpsc::UnboundedReceiver<QueuedJob>>>) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            debug!(worker, "worker loop finished (channel closed)");
            return;
        };

        if job
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Dropping `job.run` drops its result sender; the handle then
            // resolves to `Cancelled`.
            debug!(worker, task = %job.id, "job cancelled before start; skipping");
            continue;
        }

        debug!(worker, task = %job.id, "job started");
        // Run on its own Tokio task so a panicking payload doesn't take the
        // worker down with it.
        if let Err(err) = tokio::spawn((job.run)()).await {
            error!(worker, task = %job.id, error = %err, "job panicked");
        }
    }
}
