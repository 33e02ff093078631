//! Process entrypoint. Parses `--port`, loads configuration, wires tracing,
//! and serves the full route table until a shutdown signal arrives.
//!
//! Re-invoked with `--worker <id>` (by `WorkerPool::spawn_one`), it instead
//! runs as a worker child process: no HTTP listener, just a stdio channel
//! the pool can request a heap snapshot over.

use tes_core::prelude::*;
use tes_core::spline;

fn parse_cli_port() -> Option<u16> {
    std::env::args()
        .collect::<Vec<_>>()
        .windows(2)
        .find(|pair| pair[0] == "--port")
        .and_then(|pair| pair[1].parse().ok())
        .or_else(|| {
            std::env::args()
                .find_map(|arg| arg.strip_prefix("--port=").map(str::to_string))
                .and_then(|value| value.parse().ok())
        })
}

fn parse_worker_id() -> Option<String> {
    std::env::args()
        .collect::<Vec<_>>()
        .windows(2)
        .find(|pair| pair[0] == "--worker")
        .map(|pair| pair[1].clone())
}

/// Warmup tasks run once at startup, in parallel, before `/ready` reports
/// healthy: the spline engine against a 100-point synthetic curve, and the
/// AI curve detector against a 50-point synthetic price series.
fn warmup_tasks(collaborators: tes_core::collaborators::Collaborators) -> Vec<tes_core::warmup::WarmupTask> {
    let spline_check: tes_core::warmup::WarmupTask = Box::pin(async {
        let points = spline::synthetic_control_points(100);
        if spline::catmull_rom(&points, 100).len() != 100 {
            return Err("spline engine: catmull_rom sample count mismatch".to_string());
        }
        if spline::cubic(&points, 100).len() != 100 {
            return Err("spline engine: cubic sample count mismatch".to_string());
        }
        if spline::linear(&points, 100).len() != 100 {
            return Err("spline engine: linear sample count mismatch".to_string());
        }
        if spline::extrapolate(&points, 10).len() != 10 {
            return Err("spline engine: extrapolate sample count mismatch".to_string());
        }
        Ok(())
    });

    let ai_check: tes_core::warmup::WarmupTask = Box::pin(async move {
        let prices: Vec<f64> = (0..50).map(|i| (i as f64 * 0.1).sin() * 10.0 + 100.0).collect();
        let result = collaborators.curves.auto_maparse(&prices);
        if result.sample_count == 0 {
            return Err("AI curve detector: synthetic check produced no samples".to_string());
        }
        Ok(())
    });

    vec![spline_check, ai_check]
}

/// Reads `VmRSS` out of `/proc/self/status`; `0` on any platform or parse
/// failure (non-Linux, sandboxed environments without `/proc`).
fn resident_memory_kb() -> u64 {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return 0;
    };
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.trim().split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
        .unwrap_or(0)
}

/// The worker side of the heap-snapshot protocol: reads newline-delimited
/// JSON requests from stdin, and for `{"op":"snapshot"}` writes back one
/// JSON line with this process's `pid`, `uptimeMs`, and `rssKb`. Never
/// initializes tracing (see `main`, below), so stdout stays a clean
/// request/response channel rather than picking up log noise.
async fn run_worker(_id: String) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let started_at = std::time::Instant::now();
    let pid = std::process::id();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.map_err(Error::from)? {
        let Ok(request) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if request.get("op").and_then(|v| v.as_str()) != Some("snapshot") {
            continue;
        }

        let reply = serde_json::json!({
            "pid": pid,
            "uptimeMs": started_at.elapsed().as_millis() as u64,
            "rssKb": resident_memory_kb(),
        });
        let mut line = serde_json::to_string(&reply).map_err(|e| Error::internal(e.to_string()))?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await.map_err(Error::from)?;
        stdout.flush().await.map_err(Error::from)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(worker_id) = parse_worker_id() {
        return run_worker(worker_id).await;
    }

    let cli_port = parse_cli_port();
    let config = Config::load(cli_port)?;
    init_tracing(&config)?;
    headers::init_api_metadata(&config);

    let state = AppState::builder().config(config.clone()).build();
    let app = routes::build_router(state.clone());

    state.worker_pool.initialize(config.initial_worker_count).await;
    tokio::spawn({
        let warmup = state.warmup.clone();
        let tasks = warmup_tasks(state.collaborators.clone());
        async move { warmup.run(tasks).await }
    });

    tracing::info!(port = config.port, environment = %config.environment, "tes-core starting");
    Server::new(config).serve(app, state).await
}
