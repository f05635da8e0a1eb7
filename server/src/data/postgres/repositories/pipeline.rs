//! Pipeline repository: cost breakdown and listing queries
//!
//! A pipeline has no storage row; it is materialized here by grouping spans
//! on `pipeline_id`. Coverage arithmetic treats SQL NULL as "cost unknown":
//! `SUM` already skips NULLs and `COUNT(cost_total)` counts only known
//! values, so the queries never coalesce an unknown into a zero.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::read_deadline;
use crate::data::postgres::PostgresError;
use crate::data::types::{PipelineCost, PipelineSummary, StageCost};

type StageRow = (
    String,              // stage
    String,              // model
    String,              // provider
    Option<i64>,         // tokens_input
    Option<i64>,         // tokens_output
    Option<f64>,         // cost_input
    Option<f64>,         // cost_output
    Option<f64>,         // cost_total
    i64,                 // span_count
    i64,                 // covered (spans with known cost_total)
    DateTime<Utc>,       // first_seen
    DateTime<Utc>,       // last_seen
);

/// Aggregate one pipeline into its per-stage cost breakdown.
///
/// Returns `None` when no span carries the id. Stage ordering is part of
/// the response contract: cost descending with unknown-cost groups last,
/// ties broken by stage then model.
pub async fn get_pipeline_cost(
    pool: &PgPool,
    pipeline_id: &str,
) -> Result<Option<PipelineCost>, PostgresError> {
    let rows: Vec<StageRow> = read_deadline(
        sqlx::query_as(
            r#"
            SELECT
                stage,
                model,
                provider,
                SUM(tokens_input)::BIGINT AS tokens_input,
                SUM(tokens_output)::BIGINT AS tokens_output,
                SUM(cost_input) AS cost_input,
                SUM(cost_output) AS cost_output,
                SUM(cost_total) AS cost_total,
                COUNT(*) AS span_count,
                COUNT(cost_total) AS covered,
                MIN(time) AS first_seen,
                MAX(time) AS last_seen
            FROM spans
            WHERE pipeline_id = $1
            GROUP BY stage, model, provider
            ORDER BY SUM(cost_total) DESC NULLS LAST, stage ASC, model ASC
            "#,
        )
        .bind(pipeline_id)
        .fetch_all(pool),
    )
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut total_cost = 0.0;
    let mut span_count: i64 = 0;
    let mut covered: i64 = 0;
    let mut first_seen = rows[0].10;
    let mut last_seen = rows[0].11;
    let mut stages = Vec::with_capacity(rows.len());

    for row in rows {
        let (
            stage,
            model,
            provider,
            tokens_input,
            tokens_output,
            cost_input,
            cost_output,
            cost_total,
            group_count,
            group_covered,
            group_first,
            group_last,
        ) = row;

        total_cost += cost_total.unwrap_or(0.0);
        span_count += group_count;
        covered += group_covered;
        first_seen = first_seen.min(group_first);
        last_seen = last_seen.max(group_last);

        stages.push(StageCost {
            stage,
            model,
            provider,
            tokens_input,
            tokens_output,
            cost_input,
            cost_output,
            cost_total,
            span_count: group_count,
        });
    }

    let coverage_ratio = covered as f64 / span_count as f64;

    Ok(Some(PipelineCost {
        pipeline_id: pipeline_id.to_string(),
        total_cost,
        is_partial: coverage_ratio < 1.0,
        coverage_ratio,
        stages,
        first_seen,
        last_seen,
    }))
}

type SummaryRow = (String, f64, i64, i64, DateTime<Utc>, DateTime<Utc>);

/// List pipelines whose `[first_seen, last_seen]` span intersects
/// `[start, end]`, newest activity first, with the total match count for
/// pagination. Bounds are computed over all of a pipeline's spans, not
/// clipped to the window.
pub async fn list_pipelines(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: u32,
    offset: u32,
) -> Result<(Vec<PipelineSummary>, i64), PostgresError> {
    let total: i64 = read_deadline(
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT pipeline_id
                FROM spans
                GROUP BY pipeline_id
                HAVING MIN(time) <= $2 AND MAX(time) >= $1
            ) AS matching
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool),
    )
    .await?;

    let rows: Vec<SummaryRow> = read_deadline(
        sqlx::query_as(
            r#"
            SELECT
                pipeline_id,
                COALESCE(SUM(cost_total), 0) AS total_cost,
                COUNT(*) AS span_count,
                COUNT(cost_total) AS covered,
                MIN(time) AS first_seen,
                MAX(time) AS last_seen
            FROM spans
            GROUP BY pipeline_id
            HAVING MIN(time) <= $2 AND MAX(time) >= $1
            ORDER BY MAX(time) DESC, pipeline_id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(pool),
    )
    .await?;

    let pipelines = rows
        .into_iter()
        .map(
            |(pipeline_id, total_cost, span_count, covered, first_seen, last_seen)| {
                PipelineSummary {
                    pipeline_id,
                    total_cost,
                    is_partial: covered < span_count,
                    span_count,
                    first_seen,
                    last_seen,
                }
            },
        )
        .collect();

    Ok((pipelines, total))
}
