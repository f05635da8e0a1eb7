//! Span repository: batched writes into the spans hypertable

use sqlx::{PgPool, Postgres, QueryBuilder};

use super::write_deadline;
use crate::data::postgres::PostgresError;
use crate::data::types::SpanRecord;

/// Insert a batch of span records with one multi-row statement.
///
/// No dedup: a replayed batch inserts again and readers see the duplicate
/// rows by `span_id`. The identity tiebreaker in the table key keeps
/// byte-identical replays from colliding, so duplicates never surface as
/// constraint errors here.
pub async fn insert_spans(pool: &PgPool, records: &[SpanRecord]) -> Result<(), PostgresError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO spans (time, trace_id, span_id, span_name, pipeline_id, \
         stage, model, provider, tokens_input, tokens_output, \
         cost_input, cost_output, cost_total, duration_ms) ",
    );

    builder.push_values(records, |mut row, record| {
        row.push_bind(record.time)
            .push_bind(&record.trace_id)
            .push_bind(&record.span_id)
            .push_bind(&record.span_name)
            .push_bind(&record.pipeline_id)
            .push_bind(&record.stage)
            .push_bind(&record.model)
            .push_bind(&record.provider)
            .push_bind(record.tokens_input)
            .push_bind(record.tokens_output)
            .push_bind(record.cost_input)
            .push_bind(record.cost_output)
            .push_bind(record.cost_total)
            .push_bind(record.duration_ms);
    });

    write_deadline(async { builder.build().execute(pool).await }).await?;
    Ok(())
}
