//! Traces ingestion endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::types::ApiError;
use crate::data::SpanBuffer;
use crate::domain::ingest::{self, ExportTraceRequest};

#[derive(Clone)]
pub struct IngestState {
    pub buffer: Arc<SpanBuffer>,
}

/// Response when every span in the batch was accepted
#[derive(Serialize, ToSchema)]
pub struct IngestAccepted {
    pub accepted: usize,
}

/// Response when some spans were rejected; accepted siblings are still
/// enqueued
#[derive(Serialize, ToSchema)]
pub struct IngestPartial {
    pub accepted: usize,
    pub rejected: usize,
    pub errors: Vec<String>,
}

/// OTLP-JSON trace export.
///
/// Envelope faults fail the whole request with 400 before anything is
/// enqueued; per-span faults are isolated and reported in a 207 body.
/// Buffer pressure never surfaces here: enqueueing drops oldest silently
/// and the health endpoint carries the evidence.
#[utoipa::path(
    post,
    path = "/v1/traces",
    tag = "ingest",
    request_body(content = String, description = "OTLP-JSON trace export payload", content_type = "application/json"),
    responses(
        (status = 200, description = "All spans accepted", body = IngestAccepted),
        (status = 207, description = "Some spans rejected", body = IngestPartial),
        (status = 400, description = "Malformed envelope")
    )
)]
pub async fn export(
    State(state): State<IngestState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let is_json = content_type
            .to_str()
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        if !is_json {
            return ApiError::bad_request(
                "UNSUPPORTED_CONTENT_TYPE",
                "POST /v1/traces accepts application/json",
            )
            .into_response();
        }
    }

    let request: ExportTraceRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed OTLP envelope");
            return ApiError::bad_request("MALFORMED_ENVELOPE", "Request body is not a valid OTLP-JSON trace export")
                .into_response();
        }
    };

    let outcome = ingest::process_request(&request);
    let accepted = outcome.accepted.len();
    let rejected = outcome.rejections.len();

    // All-or-nothing per request: records reach the buffer only after the
    // whole payload validated, so a cancelled request leaves no partial
    // state behind.
    state.buffer.push_batch(outcome.accepted);

    if rejected == 0 {
        (StatusCode::OK, Json(IngestAccepted { accepted })).into_response()
    } else {
        tracing::debug!(accepted, rejected, "Partial span acceptance");
        let errors = outcome
            .rejections
            .iter()
            .map(|rejection| rejection.to_string())
            .collect();
        (
            StatusCode::MULTI_STATUS,
            Json(IngestPartial {
                accepted,
                rejected,
                errors,
            }),
        )
            .into_response()
    }
}
