//! Warmup orchestration and readiness gating.
//!
//! Grounded on `agents/background_worker.rs`'s task-fan-out-with-status
//! idiom, with the actor-framework plumbing removed: tasks run as plain
//! `tokio::spawn`ed futures joined with `futures::future::join_all`, and
//! completion is published through an `AtomicBool` flipped exactly once via
//! `compare_exchange` rather than through agent messages, since nothing here
//! needs a mailbox — every caller just wants to read the current state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::join_all;

/// One engine's warmup routine. Returns `Err` with a human-readable reason
/// on failure; the orchestrator records only the first error seen.
pub type WarmupTask = std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), String>> + Send>>;

#[derive(Clone, Default)]
pub struct WarmupOrchestrator {
    complete: Arc<AtomicBool>,
    error: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessStatus {
    pub ready: bool,
    pub warmup_complete: bool,
    pub status: &'static str,
}

impl WarmupOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every task in `tasks` concurrently, waits for all of them, then
    /// flips `complete` from false to true exactly once. If more than one
    /// task fails, the first failure encountered in `tasks`' order wins —
    /// later failures are logged but do not overwrite `warmup_error`.
    pub async fn run(&self, tasks: Vec<WarmupTask>) {
        let results = join_all(tasks).await;

        let mut first_error = None;
        for result in results {
            if let Err(reason) = result {
                tracing::warn!(reason = %reason, "warmup task failed");
                if first_error.is_none() {
                    first_error = Some(reason);
                }
            }
        }

        if let Some(reason) = first_error {
            let mut guard = self.error.write().expect("warmup error lock poisoned");
            *guard = Some(reason);
        }

        // Swap false->true exactly once; a second `run` call (there should
        // never be one) would no-op rather than clobber the first result.
        let _ = self
            .complete
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error.read().expect("warmup error lock poisoned").clone()
    }

    #[must_use]
    pub fn readiness(&self) -> ReadinessStatus {
        if !self.is_complete() {
            return ReadinessStatus {
                ready: false,
                warmup_complete: false,
                status: "warming_up",
            };
        }
        if self.error().is_some() {
            return ReadinessStatus {
                ready: false,
                warmup_complete: true,
                status: "error",
            };
        }
        ReadinessStatus {
            ready: true,
            warmup_complete: true,
            status: "ready",
        }
    }
}
