//! `/ws/workers/telemetry` upgrade: broadcasts worker-registry changes to
//! subscribed clients. Unknown inbound message types are ignored.

use axum::extract::ws::{Message, WebSocket};

use crate::metrics::MetricsState;
use crate::websocket::{Broadcaster, ConnectionId};
use crate::workers::WorkerRegistry;

pub const SUBPROTOCOLS: [&str; 2] = ["telemetry-v2", "telemetry-v1"];

pub async fn handle(
    mut socket: WebSocket,
    broadcaster: Broadcaster,
    registry: WorkerRegistry,
    metrics: MetricsState,
) {
    let id = ConnectionId::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    broadcaster.register(id, tx).await;
    metrics.track_websocket_open();

    let view = registry.view().await;
    if let Ok(payload) = serde_json::to_string(&serde_json::json!({
        "type": "snapshot",
        "workers": view.workers,
        "source": view.source,
    })) {
        let _ = socket.send(Message::Text(payload.into())).await;
    }

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if socket.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Unknown inbound message types on this path are
                        // ignored per the shared message contract.
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    broadcaster.unregister(&id).await;
    metrics.track_websocket_close();
}
