//! Pipeline query endpoints: cost breakdown and listing

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::QueryState;
use crate::api::types::{
    ApiError, default_list_limit, parse_timestamp_param, validate_list_limit,
};
use crate::data::postgres::repositories::pipeline;
use crate::data::types::{PipelineCost, PipelineSummary};

/// Pipeline cost breakdown.
///
/// Existence implies at least one span, so an empty result is a 404 rather
/// than an empty body.
#[utoipa::path(
    get,
    path = "/v1/pipelines/{pipeline_id}/cost",
    tag = "pipelines",
    params(
        ("pipeline_id" = String, Path, description = "Pipeline ID (attribute or defaulted trace id)")
    ),
    responses(
        (status = 200, description = "Cost breakdown by stage", body = PipelineCost),
        (status = 404, description = "Unknown pipeline")
    )
)]
pub async fn get_pipeline_cost(
    State(state): State<QueryState>,
    Path(pipeline_id): Path<String>,
) -> Result<Json<PipelineCost>, ApiError> {
    let breakdown = pipeline::get_pipeline_cost(&state.pool, &pipeline_id)
        .await
        .map_err(ApiError::from_postgres)?;

    match breakdown {
        Some(cost) => Ok(Json(cost)),
        None => Err(ApiError::not_found(
            "UNKNOWN_PIPELINE",
            format!("No spans recorded for pipeline {}", pipeline_id),
        )),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListPipelinesQuery {
    pub start: String,
    pub end: String,
    #[serde(default = "default_list_limit")]
    #[validate(custom(function = "validate_list_limit"))]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PipelineListResponse {
    pub pipelines: Vec<PipelineSummary>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

/// List pipelines active in a time window, newest activity first.
#[utoipa::path(
    get,
    path = "/v1/pipelines",
    tag = "pipelines",
    params(
        ("start" = String, Query, description = "Window start (ISO 8601, required)"),
        ("end" = String, Query, description = "Window end (ISO 8601, required)"),
        ("limit" = Option<u32>, Query, description = "Page size, max 1000 (default 100)"),
        ("offset" = Option<u32>, Query, description = "Page offset (default 0)")
    ),
    responses(
        (status = 200, description = "Pipelines intersecting the window", body = PipelineListResponse),
        (status = 400, description = "Invalid parameters")
    )
)]
pub async fn list_pipelines(
    State(state): State<QueryState>,
    Query(query): Query<ListPipelinesQuery>,
) -> Result<Json<PipelineListResponse>, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::bad_request("INVALID_PARAM", e.to_string()))?;

    let start = parse_timestamp_param("start", &query.start)?;
    let end = parse_timestamp_param("end", &query.end)?;
    if start >= end {
        return Err(ApiError::bad_request(
            "INVALID_TIME_RANGE",
            "start must be strictly before end",
        ));
    }

    let (pipelines, total) =
        pipeline::list_pipelines(&state.pool, start, end, query.limit, query.offset)
            .await
            .map_err(ApiError::from_postgres)?;

    Ok(Json(PipelineListResponse {
        pipelines,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}
