//! Domain compute endpoints: tension mapping, the WNBATOR gauge, AI curve
//! detection, threshold validation, and spline math. Each handler is a thin
//! adapter between HTTP and one `Collaborators` trait method; none of them
//! implement the underlying algorithm themselves.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;

use crate::collaborators::EdgeRelation;
use crate::error::{Error, Result};
use crate::etag;
use crate::spline::Point;
use crate::state::AppState;
use crate::validation::{parse_clamped_f64, parse_csv_f64};

/// Wall-clock budget for a single `/api/spline/render` call. Generous
/// control-point counts and the natural-cubic tridiagonal solve are both
/// O(n), but a pathological request (huge `sample_count`) shouldn't be able
/// to tie up a handler task indefinitely.
const SPLINE_RENDER_TIMEOUT: Duration = Duration::from_secs(5);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tension/map", get(tension_map))
        .route("/api/tension/batch", post(tension_batch))
        .route("/api/tension/help", get(tension_help))
        .route("/api/tension/health", get(tension_health))
        .route("/api/tension/socket-info", get(tension_socket_info))
        .route("/api/gauge/womens-sports", get(gauge))
        .route("/api/ai/maparse", post(ai_maparse))
        .route("/api/ai/models/status", get(ai_models_status))
        .route("/api/validate/threshold", get(validate_threshold))
        .route(
            "/api/spline/render",
            post(spline_render)
                .layer(TimeoutLayer::with_status_code(axum::http::StatusCode::REQUEST_TIMEOUT, SPLINE_RENDER_TIMEOUT))
                .layer(from_fn(track_spline_render_timeout)),
        )
        .route("/api/spline/predict", post(spline_predict))
        .route("/api/spline/preset/store", post(spline_preset_store))
}

/// Sits outside `TimeoutLayer` on the spline-render route only: `tower_http`
/// answers a timeout with a bare 408 before the request ever reaches
/// `spline_render`, so this is the only place that can both recognize it and
/// turn it into the service's own `Error::RequestTimeout` body while
/// counting it.
async fn track_spline_render_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() == axum::http::StatusCode::REQUEST_TIMEOUT {
        state.metrics.track_timeout();
        return Error::RequestTimeout.into_response();
    }
    response
}

#[derive(Deserialize)]
struct TensionQuery {
    conflict: String,
    entropy: String,
    tension: String,
    /// `json` (default), `csv`, `yaml`, or `table`. Every format carries the
    /// same `color.HEX`/`opacity`/`width`/`meta.relation` values for a given
    /// input, which is the round-trip property scenario 2 tests.
    #[serde(default)]
    format: Option<String>,
}

/// `GET /api/tension/map?conflict=&entropy=&tension=&format=`: the
/// ETag-revalidated, cached happy path tested end to end in scenario 2,
/// multi-format via `render_tension`.
async fn tension_map(
    State(state): State<AppState>,
    Query(query): Query<TensionQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let conflict = parse_clamped_f64("conflict", &query.conflict, 0.0, 1.0)?;
    let entropy = parse_clamped_f64("entropy", &query.entropy, 0.0, 1.0)?;
    let tension = parse_clamped_f64("tension", &query.tension, 0.0, 1.0)?;

    let cache_key = format!("{conflict}:{entropy}:{tension}");
    let data = match state.tension_cache.get(&cache_key) {
        Some(cached) => cached,
        None => {
            let relation = state.collaborators.tension.map_edge_relation(conflict, entropy, tension);
            let value = serde_json::to_value(relation).map_err(|e| Error::internal(e.to_string()))?;
            state.tension_cache.put(cache_key, value.clone());
            value
        }
    };
    let relation: EdgeRelation = serde_json::from_value(data).map_err(|e| Error::internal(e.to_string()))?;

    let format = query.format.as_deref().unwrap_or("json");
    let (body, content_type) = render_tension(&relation, format)?;

    let tag = etag::compute(&body);
    if etag::matches(&headers, &tag) {
        return Ok(axum::http::StatusCode::NOT_MODIFIED.into_response());
    }

    let mut response = Response::new(axum::body::Body::from(body));
    response.headers_mut().insert(axum::http::header::CONTENT_TYPE, content_type.parse().unwrap());
    response.headers_mut().insert(axum::http::header::ETAG, etag::header_value(&tag));
    response
        .headers_mut()
        .insert(axum::http::header::CACHE_CONTROL, "public, max-age=3600".parse().unwrap());
    Ok(response)
}

/// Renders `relation` in the requested wire format, returning the body
/// bytes and their `Content-Type`. Unrecognized formats fall back to JSON
/// rather than erroring, matching the handler's pre-existing lenient
/// parsing of other query parameters.
fn render_tension(relation: &EdgeRelation, format: &str) -> Result<(Vec<u8>, &'static str)> {
    match format {
        "csv" => Ok((render_tension_csv(relation)?, "text/csv")),
        "yaml" | "yml" => Ok((render_tension_yaml(relation)?, "application/yaml")),
        "table" => Ok((render_tension_table(relation), "text/plain")),
        _ => Ok((serde_json::to_vec(relation).map_err(|e| Error::internal(e.to_string()))?, "application/json")),
    }
}

#[derive(Serialize)]
struct TensionCsvRow<'a> {
    #[serde(rename = "color.HEX")]
    color_hex: &'a str,
    opacity: f64,
    width: u8,
    #[serde(rename = "meta.conflict")]
    meta_conflict: f64,
    #[serde(rename = "meta.entropy")]
    meta_entropy: f64,
    #[serde(rename = "meta.tension")]
    meta_tension: f64,
    #[serde(rename = "meta.relation")]
    meta_relation: &'a str,
}

impl<'a> From<&'a EdgeRelation> for TensionCsvRow<'a> {
    fn from(r: &'a EdgeRelation) -> Self {
        TensionCsvRow {
            color_hex: &r.color.hex,
            opacity: r.opacity,
            width: r.width,
            meta_conflict: r.meta.conflict,
            meta_entropy: r.meta.entropy,
            meta_tension: r.meta.tension,
            meta_relation: r.meta.relation,
        }
    }
}

fn render_tension_csv(relation: &EdgeRelation) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .serialize(TensionCsvRow::from(relation))
        .map_err(|e| Error::internal(format!("csv encode: {e}")))?;
    writer.into_inner().map_err(|e| Error::internal(format!("csv encode: {e}")))
}

fn render_tension_yaml(relation: &EdgeRelation) -> Result<Vec<u8>> {
    serde_yaml::to_string(relation)
        .map(String::into_bytes)
        .map_err(|e| Error::internal(format!("yaml encode: {e}")))
}

fn render_tension_table(relation: &EdgeRelation) -> Vec<u8> {
    format!(
        "field\t\tvalue\n\
         color.HEX\t\t{}\n\
         opacity\t\t{}\n\
         width\t\t{}\n\
         meta.conflict\t\t{}\n\
         meta.entropy\t\t{}\n\
         meta.tension\t\t{}\n\
         meta.relation\t\t{}\n",
        relation.color.hex,
        relation.opacity,
        relation.width,
        relation.meta.conflict,
        relation.meta.entropy,
        relation.meta.tension,
        relation.meta.relation,
    )
    .into_bytes()
}

#[derive(Deserialize)]
struct TensionBatchEntry {
    conflict: f64,
    entropy: f64,
    tension: f64,
}

#[derive(Deserialize)]
struct TensionBatchRequest {
    entries: Vec<TensionBatchEntry>,
}

async fn tension_batch(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<TensionBatchRequest>,
) -> Result<impl IntoResponse> {
    state.rate_limiters.api.check(&addr.ip().to_string())?;
    let results: Vec<_> = body
        .entries
        .iter()
        .map(|e| {
            state
                .collaborators
                .tension
                .map_edge_relation(e.conflict.clamp(0.0, 1.0), e.entropy.clamp(0.0, 1.0), e.tension.clamp(0.0, 1.0))
        })
        .collect();
    Ok(Json(results))
}

async fn tension_help() -> impl IntoResponse {
    Json(serde_json::json!({
        "usage": "GET /api/tension/map?conflict=<0..1>&entropy=<0..1>&tension=<0..1>",
        "batch": "POST /api/tension/batch { entries: [{conflict,entropy,tension}] }",
    }))
}

async fn tension_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn tension_socket_info() -> impl IntoResponse {
    Json(serde_json::json!({ "path": "/ws/spline-live", "subprotocols": ["spline-v2", "spline-v1"] }))
}

#[derive(Deserialize)]
struct GaugeQuery {
    values: String,
}

async fn gauge(State(state): State<AppState>, Query(query): Query<GaugeQuery>) -> Result<impl IntoResponse> {
    let tensor = parse_csv_f64("values", &query.values)?;
    let cache_key = query.values.clone();
    let result = match state.gauge_cache.get(&cache_key) {
        Some(cached) => cached,
        None => {
            let computed = state.collaborators.gauge.gauge_wnbator(&tensor);
            let value = serde_json::to_value(computed).map_err(|e| Error::internal(e.to_string()))?;
            state.gauge_cache.put(cache_key, value.clone());
            value
        }
    };
    Ok(Json(result))
}

#[derive(Deserialize)]
struct MaparseRequest {
    prices: Vec<f64>,
}

async fn ai_maparse(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<MaparseRequest>,
) -> Result<impl IntoResponse> {
    state.rate_limiters.api.check(&addr.ip().to_string())?;
    let cache_key = body.prices.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
    let result = match state.ai_cache.get(&cache_key) {
        Some(cached) => cached,
        None => {
            let computed = state.collaborators.curves.auto_maparse(&body.prices);
            let value = serde_json::to_value(computed).map_err(|e| Error::internal(e.to_string()))?;
            state.ai_cache.put(cache_key, value.clone());
            value
        }
    };
    state.metrics.track_detection();
    Ok(Json(result))
}

async fn ai_models_status(State(state): State<AppState>) -> impl IntoResponse {
    let readiness = state.warmup.readiness();
    Json(serde_json::json!({ "warmed_up": readiness.warmup_complete, "status": readiness.status }))
}

#[derive(Deserialize)]
struct ThresholdQuery {
    value: String,
}

async fn validate_threshold(State(state): State<AppState>, Query(query): Query<ThresholdQuery>) -> Result<impl IntoResponse> {
    Ok(Json(state.collaborators.threshold.validate_threshold(&query.value)?))
}

#[derive(Deserialize)]
struct SplineRenderRequest {
    control_points: Vec<Point>,
    #[serde(default = "default_sample_count")]
    sample_count: usize,
    #[serde(default)]
    method: SplineMethod,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "lowercase")]
enum SplineMethod {
    #[default]
    CatmullRom,
    Cubic,
    Linear,
}

fn default_sample_count() -> usize {
    100
}

#[derive(Serialize)]
struct SplineRenderResponse {
    points: Vec<Point>,
}

async fn spline_render(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SplineRenderRequest>,
) -> Result<impl IntoResponse> {
    state.rate_limiters.api.check(&addr.ip().to_string())?;
    if body.control_points.len() < 2 {
        return Err(Error::validation("control_points", body.control_points.len().to_string(), "at least 2 points"));
    }
    let points = match body.method {
        SplineMethod::CatmullRom => crate::spline::catmull_rom(&body.control_points, body.sample_count),
        SplineMethod::Cubic => crate::spline::cubic(&body.control_points, body.sample_count),
        SplineMethod::Linear => crate::spline::linear(&body.control_points, body.sample_count),
    };
    state.metrics.track_render();
    Ok(Json(SplineRenderResponse { points }))
}

#[derive(Deserialize)]
struct SplinePredictRequest {
    control_points: Vec<Point>,
    #[serde(default = "default_predict_count")]
    count: usize,
}

fn default_predict_count() -> usize {
    10
}

async fn spline_predict(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SplinePredictRequest>,
) -> Result<impl IntoResponse> {
    state.rate_limiters.api.check(&addr.ip().to_string())?;
    if body.control_points.len() < 2 {
        return Err(Error::validation("control_points", body.control_points.len().to_string(), "at least 2 points"));
    }
    let points = crate::spline::extrapolate(&body.control_points, body.count);
    Ok(Json(SplineRenderResponse { points }))
}

#[derive(Deserialize)]
struct SplinePresetStoreRequest {
    name: String,
    control_points: Vec<Point>,
}

async fn spline_preset_store(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SplinePresetStoreRequest>,
) -> Result<impl IntoResponse> {
    state.rate_limiters.api.check(&addr.ip().to_string())?;
    crate::presets::save(&state.config.presets_dir, &body.name, &body.control_points)?;
    state.spline_presets.insert(body.name.clone(), body.control_points);
    Ok(Json(serde_json::json!({ "stored": body.name })))
}
