//! Cost trending endpoint

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::QueryState;
use crate::api::types::{ApiError, parse_timestamp_param};
use crate::data::postgres::repositories::trending;
use crate::data::types::{TrendBucket, TrendGroupBy, TrendInterval};

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub start: String,
    pub end: String,
    pub interval: String,
    pub group_by: String,
}

/// Time-bucketed cost trend read from the continuous aggregates.
///
/// Buckets with no costed spans are still emitted, empty; unknown costs
/// were excluded at the view definition and are never re-counted as zeros.
#[utoipa::path(
    get,
    path = "/v1/cost/trending",
    tag = "trending",
    params(
        ("start" = String, Query, description = "Window start (ISO 8601, required)"),
        ("end" = String, Query, description = "Window end (ISO 8601, required)"),
        ("interval" = String, Query, description = "Bucket width: hour, day, or week"),
        ("group_by" = String, Query, description = "Breakdown dimension: model, provider, or stage")
    ),
    responses(
        (status = 200, description = "Cost buckets over the window", body = [TrendBucket]),
        (status = 400, description = "Missing or invalid parameters")
    )
)]
pub async fn get_cost_trending(
    State(state): State<QueryState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<TrendBucket>>, ApiError> {
    let start = parse_timestamp_param("start", &query.start)?;
    let end = parse_timestamp_param("end", &query.end)?;
    if start >= end {
        return Err(ApiError::bad_request(
            "INVALID_TIME_RANGE",
            "start must be strictly before end",
        ));
    }

    let interval: TrendInterval = query.interval.parse().map_err(|_| {
        ApiError::bad_request(
            "INVALID_INTERVAL",
            format!(
                "Invalid interval: {}. Expected hour, day, or week.",
                query.interval
            ),
        )
    })?;
    let group_by: TrendGroupBy = query.group_by.parse().map_err(|_| {
        ApiError::bad_request(
            "INVALID_GROUP_BY",
            format!(
                "Invalid group_by: {}. Expected model, provider, or stage.",
                query.group_by
            ),
        )
    })?;

    let buckets = trending::get_cost_trending(&state.pool, start, end, interval, group_by)
        .await
        .map_err(ApiError::from_postgres)?;

    Ok(Json(buckets))
}
