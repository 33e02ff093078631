//! Heap snapshot retrieval.
//!
//! A snapshot is requested from the worker process over its stdio channel:
//! a single `{"op":"snapshot"}` JSON line written to its stdin, answered by
//! one JSON line on its stdout carrying the worker's self-reported `pid`,
//! `uptimeMs`, and `rssKb`. The reply is merged with what the pool already
//! knows about the worker (`id`, `kind`) and handed back uncompressed;
//! gzip encoding is left to `tower_http::compression::CompressionLayer`
//! already wrapping the whole router, rather than adding a dedicated
//! streaming-gzip dependency for one endpoint.

use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::error::Error;
use crate::workers::pool::{Worker, WorkerState};

const SNAPSHOT_REQUEST: &[u8] = b"{\"op\":\"snapshot\"}\n";
const SNAPSHOT_TIMEOUT: Duration = Duration::from_millis(500);

/// Requests a heap snapshot from `worker`. Returns `ServiceUnavailable` if
/// the worker is not currently reachable (terminated, mid-termination, or
/// its stdio channel was never established), and `RequestTimeout` if the
/// worker does not answer within `SNAPSHOT_TIMEOUT`.
pub async fn fetch_heap_snapshot(worker: &Worker) -> Result<Vec<u8>, Error> {
    match worker.state() {
        WorkerState::Terminated | WorkerState::Terminating => {
            return Err(Error::service_unavailable(
                format!("worker {} is not running; snapshot unavailable", worker.id),
                5,
            ));
        }
        _ => {}
    }

    if let Some(child) = worker.child.lock().await.as_mut() {
        if matches!(child.try_wait(), Ok(Some(_))) {
            worker.set_state(WorkerState::Terminated);
            return Err(Error::service_unavailable(
                format!("worker {} exited unexpectedly; snapshot unavailable", worker.id),
                5,
            ));
        }
    }

    let mut io_guard = worker.io.lock().await;
    let Some(io) = io_guard.as_mut() else {
        return Err(Error::service_unavailable(
            format!("worker {} has no stdio channel; snapshot unavailable", worker.id),
            5,
        ));
    };

    io.stdin.write_all(SNAPSHOT_REQUEST).await?;
    io.stdin.flush().await?;

    let line = match tokio::time::timeout(SNAPSHOT_TIMEOUT, io.stdout.next_line()).await {
        Ok(Ok(Some(line))) => line,
        Ok(Ok(None)) => {
            drop(io_guard);
            worker.set_state(WorkerState::Terminated);
            return Err(Error::service_unavailable(
                format!("worker {} closed its stdio channel; snapshot unavailable", worker.id),
                5,
            ));
        }
        Ok(Err(e)) => return Err(Error::from(e)),
        Err(_elapsed) => return Err(Error::RequestTimeout),
    };
    drop(io_guard);

    let mut reported: serde_json::Value =
        serde_json::from_str(&line).map_err(|e| Error::internal(format!("malformed worker snapshot reply: {e}")))?;
    if let Some(map) = reported.as_object_mut() {
        map.insert("workerId".to_string(), serde_json::Value::String(worker.id.to_string()));
        map.insert("kind".to_string(), serde_json::Value::String(worker.kind.clone()));
    }
    serde_json::to_vec(&reported).map_err(|e| Error::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::sync::atomic::AtomicU64;
    use std::time::Instant;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::process::Command;

    fn test_worker(state: WorkerState) -> Worker {
        Worker {
            id: crate::workers::pool::WorkerId(1),
            kind: "api".to_string(),
            state: std::sync::RwLock::new(state),
            queue_depth: AtomicU64::new(0),
            created_at: Instant::now(),
            terminated_at: std::sync::RwLock::new(None),
            child: tokio::sync::Mutex::new(None),
            io: tokio::sync::Mutex::new(None),
        }
    }

    /// Spawns a tiny shell "worker" that answers exactly one snapshot
    /// request, standing in for a real `--worker` child process in tests
    /// that don't want to re-exec the test binary itself.
    async fn worker_with_fake_child(reply: &str) -> Worker {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(format!("read _line; echo '{reply}'"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("spawn test worker shell");
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();

        let mut worker = test_worker(WorkerState::Idle);
        worker.io = tokio::sync::Mutex::new(Some(crate::workers::pool::WorkerIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        }));
        worker.child = tokio::sync::Mutex::new(Some(child));
        worker
    }

    #[tokio::test]
    async fn terminated_worker_returns_service_unavailable() {
        let worker = test_worker(WorkerState::Terminated);
        let result = fetch_heap_snapshot(&worker).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn idle_worker_with_no_stdio_channel_is_unavailable() {
        let worker = test_worker(WorkerState::Idle);
        let result = fetch_heap_snapshot(&worker).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn idle_worker_with_live_stdio_returns_merged_snapshot() {
        let worker = worker_with_fake_child(r#"{"pid":4242,"uptimeMs":10,"rssKb":2048}"#).await;
        let bytes = fetch_heap_snapshot(&worker).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["pid"], 4242);
        assert_eq!(body["workerId"], "worker-1");
        assert_eq!(body["kind"], "api");
    }

    #[tokio::test]
    async fn malformed_reply_is_internal_error() {
        let worker = worker_with_fake_child("not json").await;
        let result = fetch_heap_snapshot(&worker).await;
        assert!(result.is_err());
    }
}
