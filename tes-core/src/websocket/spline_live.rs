//! `/ws/spline-live`: a 60 FPS (16.67ms) broadcast of a rendered Catmull-Rom
//! path, running only while at least one client is connected.
//!
//! The open-while-≥1-client discipline is a `tokio::sync::watch<usize>`
//! connection-count channel; the spawned broadcast task awaits a nonzero
//! count before arming its interval and exits entirely (not just idling)
//! once the count returns to zero, so an idle server runs no spline-render
//! work at all.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::watch;

use crate::metrics::MetricsState;
use crate::spline::{catmull_rom, synthetic_control_points};
use crate::websocket::{Broadcaster, ConnectionId};

pub const SUBPROTOCOLS: [&str; 2] = ["spline-v2", "spline-v1"];
const TICK: Duration = Duration::from_micros(16_667);
const POINTS_PER_FRAME: usize = 100;

pub struct SplineLiveState {
    broadcaster: Broadcaster,
    count_tx: watch::Sender<usize>,
}

impl Default for SplineLiveState {
    fn default() -> Self {
        let (count_tx, _count_rx) = watch::channel(0);
        Self {
            broadcaster: Broadcaster::new(),
            count_tx,
        }
    }
}

impl Clone for SplineLiveState {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            count_tx: self.count_tx.clone(),
        }
    }
}

impl SplineLiveState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connection_count(&self) -> usize {
        self.broadcaster.connection_count().await
    }

    /// Spawns the broadcast loop the first time a client connects; the task
    /// exits on its own once the connection count returns to zero, so this
    /// is safe to call on every connect (subsequent calls are no-ops since
    /// the watch channel is shared and the loop is already running, or a
    /// fresh loop starts if the previous one has already exited).
    fn ensure_loop_running(&self) {
        let broadcaster = self.broadcaster.clone();
        let mut count_rx = self.count_tx.subscribe();
        tokio::spawn(async move {
            loop {
                if *count_rx.borrow() == 0 {
                    if count_rx.changed().await.is_err() {
                        return;
                    }
                    continue;
                }

                let mut interval = tokio::time::interval(TICK);
                let mut frame: u64 = 0;
                loop {
                    if *count_rx.borrow() == 0 {
                        break;
                    }
                    interval.tick().await;
                    frame += 1;
                    let control = synthetic_control_points(8);
                    let points = catmull_rom(&control, POINTS_PER_FRAME);
                    let payload = serde_json::json!({
                        "type": "data",
                        "t": frame as f64 * TICK.as_secs_f64(),
                        "points": POINTS_PER_FRAME,
                        "data": points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
                        "metadata": { "timestamp": frame, "frame": frame },
                    });
                    if let Ok(text) = serde_json::to_string(&payload) {
                        broadcaster.broadcast_all(Message::Text(text.into())).await;
                    }

                    if count_rx.has_changed().unwrap_or(false) && *count_rx.borrow() == 0 {
                        break;
                    }
                }
            }
        });
    }
}

pub async fn handle(mut socket: WebSocket, state: SplineLiveState, metrics: MetricsState) {
    let id = ConnectionId::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    state.broadcaster.register(id, tx).await;
    metrics.track_websocket_open();

    let new_count = state.broadcaster.connection_count().await;
    let _ = state.count_tx.send(new_count);
    if new_count == 1 {
        state.ensure_loop_running();
    }

    let connection_payload = serde_json::json!({
        "type": "connection",
        "id": id.to_string(),
        "tick_hz": (1.0 / TICK.as_secs_f64()).round(),
    });
    if let Ok(text) = serde_json::to_string(&connection_payload) {
        if socket.send(Message::Text(text.into())).await.is_err() {
            state.broadcaster.unregister(&id).await;
            metrics.track_websocket_close();
            let remaining = state.broadcaster.connection_count().await;
            let _ = state.count_tx.send(remaining);
            return;
        }
    }

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => if socket.send(message).await.is_err() { break; },
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.broadcaster.unregister(&id).await;
    metrics.track_websocket_close();
    let remaining = state.broadcaster.connection_count().await;
    let _ = state.count_tx.send(remaining);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_state_has_no_connections() {
        let state = SplineLiveState::new();
        assert_eq!(state.broadcaster.connection_count().await, 0);
    }
}
