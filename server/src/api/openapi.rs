//! OpenAPI documentation

use axum::Json;
use axum::response::IntoResponse;
use utoipa::OpenApi;

use super::routes;
use crate::data::types::{
    BreakdownEntry, PipelineCost, PipelineSummary, StageCost, TrendBucket,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hikari Collector API",
        description = "Cost observability for multi-step LLM workflows: OTLP-JSON span \
                       ingestion and pipeline-level cost aggregation.",
    ),
    paths(
        routes::traces::export,
        routes::pipelines::get_pipeline_cost,
        routes::pipelines::list_pipelines,
        routes::trending::get_cost_trending,
        routes::health::health,
    ),
    components(schemas(
        routes::traces::IngestAccepted,
        routes::traces::IngestPartial,
        routes::pipelines::PipelineListResponse,
        routes::health::HealthResponse,
        PipelineCost,
        PipelineSummary,
        StageCost,
        TrendBucket,
        BreakdownEntry,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
