//! Black-box end-to-end tests driving the full `axum::Router` through
//! `tower::ServiceExt::oneshot`, one per scenario.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tower::ServiceExt;

use tes_core::config::Config;
use tes_core::routes;
use tes_core::state::AppState;

fn test_state() -> AppState {
    AppState::builder().config(Config::default()).build()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn readiness_gate_transitions_from_warming_up_to_ready() {
    let state = test_state();
    let app = routes::build_router(state.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get("Retry-After").unwrap(), "2");
    let body = body_json(response).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["warmupComplete"], false);
    assert_eq!(body["status"], "warming_up");

    state.warmup.run(Vec::new()).await;

    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Ready").unwrap(), "1");
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["warmupComplete"], true);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn tension_mapping_happy_path_revalidates_with_etag() {
    let state = test_state();
    let app = routes::build_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/tension/map?conflict=1.0&entropy=0.0&tension=0.0&format=json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "public, max-age=3600");
    let etag = response.headers().get("ETag").unwrap().to_str().unwrap().to_string();

    let body = body_json(response).await;
    let hex = body["color"]["HEX"].as_str().unwrap();
    assert!(hex.starts_with('#') && hex.len() == 7);
    let opacity = body["opacity"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&opacity));
    let width = body["width"].as_u64().unwrap();
    assert!((1..=4).contains(&width));

    let repeat = app
        .oneshot(
            Request::get("/api/tension/map?conflict=1.0&entropy=0.0&tension=0.0&format=json")
                .header("If-None-Match", etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::NOT_MODIFIED);
    let bytes = to_bytes(repeat.into_body(), 1024).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn worker_scaling_requires_dev_token_and_local_origin() {
    let state = test_state();
    let app = routes::build_router(state.clone());
    let before = state.worker_pool.total_spawns();

    let authorized = app
        .clone()
        .oneshot(
            Request::post("/api/workers/scale")
                .header("X-TES-Dev-Token", state.config.dev_token.clone())
                .header("content-type", "application/json")
                .body(Body::from(r#"{"action":"spawn","count":2,"type":"api"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);
    assert_eq!(state.worker_pool.total_spawns(), before + 2);

    let missing_token = app
        .clone()
        .oneshot(
            Request::post("/api/workers/scale")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"action":"spawn","count":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing_token.status(), StatusCode::UNAUTHORIZED);

    let foreign_origin = app
        .oneshot(
            Request::post("/api/workers/scale")
                .header("X-TES-Dev-Token", state.config.dev_token.clone())
                .header("Origin", "http://evil.example:3002")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"action":"spawn","count":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(foreign_origin.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn worker_snapshot_is_rate_limited_per_worker_id() {
    let state = test_state();
    let app = routes::build_router(state.clone());

    let spawn = app
        .clone()
        .oneshot(
            Request::post("/api/workers/scale")
                .header("X-TES-Dev-Token", state.config.dev_token.clone())
                .header("content-type", "application/json")
                .body(Body::from(r#"{"action":"spawn","count":1,"type":"api"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(spawn.status(), StatusCode::OK);

    let worker_path = "/api/workers/snapshot/worker-1";
    let first = app
        .clone()
        .oneshot(
            Request::get(worker_path)
                .header("X-TES-Dev-Token", state.config.dev_token.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(first.status() == StatusCode::OK || first.status() == StatusCode::SERVICE_UNAVAILABLE);

    let second = app
        .oneshot(
            Request::get(worker_path)
                .header("X-TES-Dev-Token", state.config.dev_token.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers().get("X-RateLimit-Remaining").unwrap(), "0");
    assert!(second.headers().contains_key("Retry-After"));
}

#[tokio::test]
async fn csrf_token_is_single_use_across_version_bump() {
    let state = test_state();
    let app = routes::build_router(state);

    let issued = app
        .clone()
        .oneshot(Request::get("/api/auth/csrf-token").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(issued.status(), StatusCode::OK);
    let body = body_json(issued).await;
    let token = body["token"].as_str().unwrap().to_string();

    let first_bump = app
        .clone()
        .oneshot(
            Request::post("/api/dev/bump-version")
                .header("X-CSRF-Token", token.clone())
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type":"patch","entity":"global:api-version"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first_bump.status(), StatusCode::OK);
    let body = body_json(first_bump).await;
    assert!(body.get("oldVersion").is_some());
    assert!(body.get("newVersion").is_some());

    let reused = app
        .oneshot(
            Request::post("/api/dev/bump-version")
                .header("X-CSRF-Token", token)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type":"patch","entity":"global:api-version"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(reused.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_api_path_returns_json_404_and_unknown_asset_path_returns_text_404() {
    let state = test_state();
    let app = routes::build_router(state);

    let api_404 = app
        .clone()
        .oneshot(Request::get("/api/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(api_404.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        api_404.headers().get("content-type").unwrap().to_str().unwrap(),
        "application/json"
    );

    let text_404 = app
        .oneshot(Request::get("/no-such-page").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(text_404.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spline_live_broadcasts_until_the_last_client_disconnects() {
    let state = test_state();
    let app = routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    let url = format!("ws://{addr}/ws/spline-live");

    let (mut client_a, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let connection_frame = next_json(&mut client_a).await;
    assert_eq!(connection_frame["type"], "connection");
    let data_frame = next_json(&mut client_a).await;
    assert_eq!(data_frame["type"], "data");

    let (mut client_b, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let _ = next_json(&mut client_b).await; // client B's own connection envelope

    let (from_a, from_b) = tokio::join!(next_json(&mut client_a), next_json(&mut client_b));
    assert_eq!(from_a["type"], "data");
    assert_eq!(from_b["type"], "data");

    client_a.close(None).await.unwrap();
    drop(client_a);

    // broadcast continues with client B still connected
    let still_broadcasting = next_json(&mut client_b).await;
    assert_eq!(still_broadcasting["type"], "data");

    client_b.close(None).await.unwrap();
    drop(client_b);

    // give the handler's unregister path a moment to run before asserting
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.spline_live.connection_count().await, 0);
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(stream: &mut WsStream) -> Value {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for a websocket frame")
            .expect("stream ended before a frame arrived")
            .unwrap()
        {
            WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected websocket message: {other:?}"),
        }
    }
}
