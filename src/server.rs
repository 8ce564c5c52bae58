//! HTTP control API: axum router and request handlers.
//!
//! The clock is controlled like a smart bulb: on/off, brightness, hue and
//! saturation. Color changes only touch the shared configuration, which
//! the engine picks up on its next tick. Power changes go through the
//! [`Controller`] and may block on the engine handshake, so they run on
//! tokio's blocking pool.
//!
//! ## Rust concepts
//! - axum extractors: `State`, `Json`
//! - `tokio::task::spawn_blocking` to call sync code from async handlers
//! - `RangeInclusive::contains` for request validation

use crate::arbiter::{ClockStatus, Controller, Mode};
use crate::sim::SimSnapshot;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, String);

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(get_status, post_power, post_brightness, post_hue, post_saturation),
    components(schemas(
        ClockStatus,
        Mode,
        SimSnapshot,
        PowerRequest,
        BrightnessRequest,
        HueRequest,
        SaturationRequest,
    )),
    tags(
        (name = "clock", description = "Power and color control"),
        (name = "system", description = "System status endpoints"),
    ),
    info(
        title = "Pong Clock API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for the LED matrix Pong clock"
    )
)]
pub struct ApiDoc;

// ── Request types ────────────────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PowerRequest {
    /// true to turn the clock on, false to turn it off
    #[schema(example = true)]
    on: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BrightnessRequest {
    /// Panel brightness (0-100)
    #[schema(example = 30, minimum = 0, maximum = 100)]
    value: i64,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct HueRequest {
    /// Hue in degrees (0-360)
    #[schema(example = 120.0, minimum = 0, maximum = 360)]
    value: f64,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaturationRequest {
    /// Saturation in percent (0-100)
    #[schema(example = 100.0, minimum = 0, maximum = 100)]
    value: f64,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(
                    utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
                        .validator_url("none"),
                ),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/power", post(post_power))
        .route("/api/v1/brightness", post(post_brightness))
        .route("/api/v1/hue", post(post_hue))
        .route("/api/v1/saturation", post(post_saturation))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /api/v1/status — mode, power, color and the state of the match
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current clock status", body = ClockStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<ClockStatus> {
    Json(state.controller.status())
}

/// POST /api/v1/power — turn the clock on or off
#[utoipa::path(
    post,
    path = "/api/v1/power",
    tag = "clock",
    request_body = PowerRequest,
    responses(
        (status = 200, description = "Power changed", body = ClockStatus),
        (status = 500, description = "Engine could not be started")
    )
)]
async fn post_power(
    State(state): State<AppState>,
    Json(req): Json<PowerRequest>,
) -> Result<Json<ClockStatus>, ApiError> {
    let controller = state.controller.clone();
    tokio::task::spawn_blocking(move || controller.set_power(req.on))
        .await
        .map_err(|e| internal(format!("Power task failed: {e}")))?
        .map_err(|e| internal(format!("Could not start the clock: {e}")))?;

    Ok(Json(state.controller.status()))
}

/// POST /api/v1/brightness — set panel brightness (0-100)
#[utoipa::path(
    post,
    path = "/api/v1/brightness",
    tag = "clock",
    request_body = BrightnessRequest,
    responses(
        (status = 200, description = "Brightness updated", body = ClockStatus),
        (status = 400, description = "Value out of range")
    )
)]
async fn post_brightness(
    State(state): State<AppState>,
    Json(req): Json<BrightnessRequest>,
) -> Result<Json<ClockStatus>, ApiError> {
    let value = check_brightness(req.value)?;
    state.controller.config().update(|c| c.color.value = value);
    tracing::info!("Brightness set to {}", value);
    Ok(Json(state.controller.status()))
}

/// POST /api/v1/hue — set the hue in degrees (0-360)
#[utoipa::path(
    post,
    path = "/api/v1/hue",
    tag = "clock",
    request_body = HueRequest,
    responses(
        (status = 200, description = "Hue updated", body = ClockStatus),
        (status = 400, description = "Value out of range")
    )
)]
async fn post_hue(
    State(state): State<AppState>,
    Json(req): Json<HueRequest>,
) -> Result<Json<ClockStatus>, ApiError> {
    let value = check_range("hue", req.value, 0.0..=360.0)?;
    state.controller.config().update(|c| c.color.hue = value);
    tracing::info!("Hue set to {}", value);
    Ok(Json(state.controller.status()))
}

/// POST /api/v1/saturation — set the saturation in percent (0-100)
#[utoipa::path(
    post,
    path = "/api/v1/saturation",
    tag = "clock",
    request_body = SaturationRequest,
    responses(
        (status = 200, description = "Saturation updated", body = ClockStatus),
        (status = 400, description = "Value out of range")
    )
)]
async fn post_saturation(
    State(state): State<AppState>,
    Json(req): Json<SaturationRequest>,
) -> Result<Json<ClockStatus>, ApiError> {
    let value = check_range("saturation", req.value, 0.0..=100.0)?;
    state.controller.config().update(|c| c.color.saturation = value);
    tracing::info!("Saturation set to {}", value);
    Ok(Json(state.controller.status()))
}

// ── Validation ───────────────────────────────────────────────────────

fn check_brightness(value: i64) -> Result<u8, ApiError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| bad_request(format!("brightness must be 0-100, got {value}")))
}

/// NaN fails `contains`, so it's rejected along with everything else.
fn check_range(name: &str, value: f64, range: RangeInclusive<f64>) -> Result<f64, ApiError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(bad_request(format!(
            "{name} must be {}-{}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn bad_request(msg: String) -> ApiError {
    (StatusCode::BAD_REQUEST, msg)
}

fn internal(msg: String) -> ApiError {
    tracing::error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, msg)
}
