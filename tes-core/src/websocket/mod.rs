//! WebSocket support: four upgrade handlers sharing one connection-id and
//! broadcaster scheme, each streaming a different live feed (worker
//! telemetry, spline animation, version-bump notifications, server
//! metrics) to subscribed dashboard clients over the same HTTP port the
//! REST API listens on.

mod broadcast;
mod handler;
pub mod server_metrics;
pub mod spline_live;
pub mod subscribers;
pub mod telemetry;
pub mod version_ws;

// Re-exports
pub use broadcast::{BroadcastTarget, Broadcaster};
pub use handler::{ConnectionId, WebSocketConnection};
pub use subscribers::{SubscriberCounts, Topic};

// Re-export axum WebSocket types for convenience
pub use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
