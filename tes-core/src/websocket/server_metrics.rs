//! `/ws/server-metrics/live`: no subprotocol negotiation, independent
//! 500ms timer per client.

use axum::extract::ws::{Message, WebSocket};

use crate::event_loop::EventLoopMetrics;
use crate::metrics::MetricsState;
use crate::websocket::subscribers::SubscriberCounts;

const TICK: std::time::Duration = std::time::Duration::from_millis(500);

pub async fn handle(mut socket: WebSocket, metrics: MetricsState, event_loop: EventLoopMetrics, subscribers: SubscriberCounts) {
    metrics.track_websocket_open();
    let mut interval = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let http_snapshot = metrics.snapshot();
                let subs = subscribers.snapshot();
                let payload = serde_json::json!({
                    "timestamp": http_snapshot.timestamp_ns,
                    "http": {
                        "pendingRequests": http_snapshot.pending_requests,
                        "totalRequests": http_snapshot.total_requests,
                    },
                    "websockets": {
                        "pending": http_snapshot.pending_websockets,
                        "subscribers": {
                            "chat": subs.chat,
                            "status": subs.status_live,
                            "workers": subs.workers,
                            "spline": subs.spline_live,
                        },
                        "totalSubscribers": subs.total_subscribers,
                    },
                    "eventLoop": event_loop.snapshot(),
                });
                if let Ok(text) = serde_json::to_string(&payload) {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
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

    metrics.track_websocket_close();
}
