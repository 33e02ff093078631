//! The worker pool: pre-spawned OS child processes and their state machine.
//!
//! Grounded on `other_examples/doorway-src-worker-pool.rs`'s `WorkerPool`
//! (fixed pool size, per-worker task, success/error counters) and
//! `kubewarden-controller`'s worker bootstrap/dispatch discipline, adapted
//! from "workers are long-lived connections to one shared backend" to
//! "workers are independent OS subprocesses with their own
//! spawning→idle→working→idle|error lifecycle, individually terminable."
//!
//! Each worker is this same binary re-invoked with `--worker`, which keeps
//! the pool self-contained (no external worker binary to locate or ship)
//! while still exercising a real child-process lifecycle end to end.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// The worker's stdio channel, reserved for the heap-snapshot request/
/// response protocol (see `workers::snapshot`). `stdin`/`stdout` are taken
/// off the `Child` independently of `child.kill_on_drop`/`wait`, so the
/// pool can still terminate the process while this struct is mid-request.
pub(crate) struct WorkerIo {
    pub(crate) stdin: ChildStdin,
    pub(crate) stdout: Lines<BufReader<ChildStdout>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkerId(pub u64);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// `spawning → idle → working → idle | error`, with `terminating →
/// terminated` absorbing from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Spawning,
    Idle,
    Working,
    Error,
    Terminating,
    Terminated,
}

pub struct Worker {
    pub id: WorkerId,
    pub kind: String,
    pub state: std::sync::RwLock<WorkerState>,
    pub queue_depth: AtomicU64,
    pub created_at: Instant,
    pub terminated_at: std::sync::RwLock<Option<Instant>>,
    pub(crate) child: Mutex<Option<Child>>,
    pub(crate) io: Mutex<Option<WorkerIo>>,
}

impl Worker {
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.read().expect("worker state lock poisoned")
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        *self.state.write().expect("worker state lock poisoned") = state;
    }
}

/// Serializable view of one worker, the shape `/api/workers/registry`
/// returns per entry.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: WorkerState,
    pub queue_depth: u64,
    pub uptime_ms: u128,
}

impl From<&Worker> for WorkerSummary {
    fn from(worker: &Worker) -> Self {
        Self {
            id: worker.id.to_string(),
            kind: worker.kind.clone(),
            state: worker.state(),
            queue_depth: worker.queue_depth.load(Ordering::SeqCst),
            uptime_ms: worker.created_at.elapsed().as_millis(),
        }
    }
}

#[derive(Clone)]
pub struct WorkerPool {
    workers: Arc<DashMap<WorkerId, Arc<Worker>>>,
    next_id: Arc<AtomicU64>,
    total_spawns: Arc<AtomicU64>,
    total_terminations: Arc<AtomicU64>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            workers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            total_spawns: Arc::new(AtomicU64::new(0)),
            total_terminations: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl WorkerPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `count` workers at startup. Failures to spawn an individual
    /// worker are logged and skipped; `initializeWorkerPool` does not fail
    /// the whole boot sequence over one bad subprocess launch.
    pub async fn initialize(&self, count: usize) {
        for _ in 0..count {
            if let Err(error) = self.spawn_one("api").await {
                tracing::warn!(%error, "failed to spawn initial worker");
            }
        }
    }

    pub async fn spawn(&self, count: usize, kind: &str) -> Result<Vec<WorkerId>> {
        let mut spawned = Vec::with_capacity(count);
        for _ in 0..count {
            spawned.push(self.spawn_one(kind).await?);
        }
        Ok(spawned)
    }

    async fn spawn_one(&self, kind: &str) -> Result<WorkerId> {
        let id = WorkerId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let worker = Arc::new(Worker {
            id,
            kind: kind.to_string(),
            state: std::sync::RwLock::new(WorkerState::Spawning),
            queue_depth: AtomicU64::new(0),
            created_at: Instant::now(),
            terminated_at: std::sync::RwLock::new(None),
            child: Mutex::new(None),
            io: Mutex::new(None),
        });

        let exe = std::env::current_exe().map_err(Error::from)?;
        let mut child = Command::new(exe)
            .arg("--worker")
            .arg(id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::from)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        if let (Some(stdin), Some(stdout)) = (stdin, stdout) {
            *worker.io.lock().await = Some(WorkerIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            });
        }

        *worker.child.lock().await = Some(child);
        worker.set_state(WorkerState::Idle);

        self.workers.insert(id, worker);
        self.total_spawns.fetch_add(1, Ordering::SeqCst);
        tracing::info!(worker_id = %id, kind, "worker spawned");
        Ok(id)
    }

    pub async fn terminate(&self, id: WorkerId) -> Result<()> {
        let Some((_, worker)) = self.workers.remove(&id) else {
            return Err(Error::not_found(format!("worker {id}")));
        };
        worker.set_state(WorkerState::Terminating);
        if let Some(mut child) = worker.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        worker.set_state(WorkerState::Terminated);
        *worker.terminated_at.write().expect("worker state lock poisoned") = Some(Instant::now());
        self.total_terminations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(worker_id = %id, "worker terminated");
        Ok(())
    }

    /// Terminates every worker. Used during graceful shutdown.
    pub async fn terminate_all(&self) {
        let ids: Vec<WorkerId> = self.workers.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            let _ = self.terminate(id).await;
        }
    }

    #[must_use]
    pub fn get(&self, id: WorkerId) -> Option<Arc<Worker>> {
        self.workers.get(&id).map(|entry| entry.value().clone())
    }

    /// Point-in-time snapshot of every worker, taken without holding the map
    /// locked across the caller's use of the result.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkerSummary> {
        self.workers.iter().map(|entry| WorkerSummary::from(entry.value().as_ref())).collect()
    }

    #[must_use]
    pub fn total_spawns(&self) -> u64 {
        self.total_spawns.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn total_terminations(&self) -> u64 {
        self.total_terminations.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_id_formats_with_prefix() {
        assert_eq!(WorkerId(7).to_string(), "worker-7");
    }

    #[tokio::test]
    async fn terminating_an_unknown_worker_is_not_found() {
        let pool = WorkerPool::new();
        let result = pool.terminate(WorkerId(999)).await;
        assert!(result.is_err());
    }

    #[test]
    fn snapshot_of_empty_pool_is_empty() {
        let pool = WorkerPool::new();
        assert!(pool.snapshot().is_empty());
    }
}
