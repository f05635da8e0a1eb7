//! Health check endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::constants::BUFFER_UNHEALTHY_THRESHOLD;
use crate::data::SpanBuffer;
use crate::domain::WriterStatus;

#[derive(Clone)]
pub struct HealthState {
    pub buffer: Arc<SpanBuffer>,
    pub writer: Arc<WriterStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_connected: bool,
    pub buffer_usage: f64,
    pub version: &'static str,
}

/// Health check endpoint.
///
/// `unhealthy` when the buffer is nearly full (ingest is about to shed
/// data), `degraded` when the database is unreachable but the buffer still
/// absorbs writes, `healthy` otherwise.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Collector health", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let db_connected = state.writer.is_connected();
    let buffer_usage = state.buffer.usage();

    let status = if buffer_usage > BUFFER_UNHEALTHY_THRESHOLD {
        "unhealthy"
    } else if !db_connected {
        "degraded"
    } else {
        "healthy"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            db_connected,
            buffer_usage,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
