//! TimescaleDB schema for span storage
//!
//! One hypertable holds every ingested span; three continuous aggregates
//! roll known costs up per hour/day/week. The aggregates exclude rows with
//! unknown cost at the view definition, so query code never has to filter
//! NULLs out of pre-bucketed data.
//!
//! Ingest promises no dedup: a replayed batch must insert again and be
//! visible as duplicate rows by `span_id`. The `ingest_seq` identity column
//! in the key keeps byte-identical replays from colliding on
//! `(time, span_id)`.

/// Current schema version. Bump when adding a versioned migration.
pub const SCHEMA_VERSION: i32 = 1;

/// Base tables and indexes. Runs as a single multi-statement batch.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS spans (
    time TIMESTAMPTZ NOT NULL,
    trace_id TEXT NOT NULL,
    span_id TEXT NOT NULL,
    span_name TEXT NOT NULL,
    pipeline_id TEXT NOT NULL,
    stage TEXT NOT NULL,
    model TEXT NOT NULL,
    provider TEXT NOT NULL,
    tokens_input BIGINT,
    tokens_output BIGINT,
    cost_input DOUBLE PRECISION,
    cost_output DOUBLE PRECISION,
    cost_total DOUBLE PRECISION,
    duration_ms DOUBLE PRECISION NOT NULL,
    ingest_seq BIGINT GENERATED ALWAYS AS IDENTITY,
    PRIMARY KEY (time, span_id, ingest_seq)
);

CREATE INDEX IF NOT EXISTS idx_spans_pipeline_id ON spans (pipeline_id, time DESC);
CREATE INDEX IF NOT EXISTS idx_spans_trace_id ON spans (trace_id, time DESC);
CREATE INDEX IF NOT EXISTS idx_spans_model ON spans (model, time DESC);
CREATE INDEX IF NOT EXISTS idx_spans_provider ON spans (provider, time DESC);
"#;

/// Converts `spans` into a hypertable with 1-day chunks. Must run after
/// `SCHEMA` and before any continuous aggregate.
pub const CREATE_HYPERTABLE: &str = "SELECT create_hypertable('spans', 'time', \
     chunk_time_interval => INTERVAL '1 day', if_not_exists => TRUE);";

/// Drop chunks older than the retention window.
pub fn retention_policy(retention_days: u32) -> String {
    format!(
        "SELECT add_retention_policy('spans', INTERVAL '{} days', if_not_exists => TRUE);",
        retention_days
    )
}

fn continuous_aggregate(view: &str, bucket_width: &str) -> String {
    format!(
        r#"CREATE MATERIALIZED VIEW IF NOT EXISTS {view}
WITH (timescaledb.continuous) AS
SELECT
    time_bucket(INTERVAL '{bucket_width}', time) AS bucket,
    pipeline_id,
    stage,
    model,
    provider,
    SUM(cost_total) AS cost_total,
    SUM(tokens_input) AS tokens_input,
    SUM(tokens_output) AS tokens_output,
    COUNT(*) AS span_count,
    AVG(cost_total) AS avg_cost
FROM spans
WHERE cost_total IS NOT NULL
GROUP BY bucket, pipeline_id, stage, model, provider
WITH NO DATA;"#
    )
}

fn refresh_policy(view: &str, start_offset: &str, end_offset: &str, every: &str) -> String {
    format!(
        "SELECT add_continuous_aggregate_policy('{view}', \
         start_offset => INTERVAL '{start_offset}', \
         end_offset => INTERVAL '{end_offset}', \
         schedule_interval => INTERVAL '{every}', \
         if_not_exists => TRUE);"
    )
}

/// Continuous aggregate DDL, one statement per entry. Each must run outside
/// an explicit transaction, so callers execute them individually.
pub fn continuous_aggregates() -> Vec<String> {
    vec![
        continuous_aggregate("cost_hourly", "1 hour"),
        continuous_aggregate("cost_daily", "1 day"),
        continuous_aggregate("cost_weekly", "7 days"),
    ]
}

/// Refresh policies matching the aggregate cadence: recent buckets are
/// re-materialized frequently, older ones left alone.
pub fn refresh_policies() -> Vec<String> {
    vec![
        refresh_policy("cost_hourly", "2 hours", "5 minutes", "5 minutes"),
        refresh_policy("cost_daily", "2 days", "1 hour", "1 hour"),
        refresh_policy("cost_weekly", "2 weeks", "6 hours", "6 hours"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_spans_table() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS spans"));
        assert!(SCHEMA.contains("PRIMARY KEY (time, span_id, ingest_seq)"));
    }

    #[test]
    fn test_retention_policy_uses_configured_days() {
        let sql = retention_policy(45);
        assert!(sql.contains("INTERVAL '45 days'"));
    }

    #[test]
    fn test_aggregates_exclude_unknown_costs() {
        for ddl in continuous_aggregates() {
            assert!(ddl.contains("WHERE cost_total IS NOT NULL"));
            assert!(ddl.contains("timescaledb.continuous"));
        }
    }

    #[test]
    fn test_one_policy_per_aggregate() {
        let policies = refresh_policies();
        assert_eq!(policies.len(), continuous_aggregates().len());
        for view in ["cost_hourly", "cost_daily", "cost_weekly"] {
            assert!(policies.iter().any(|p| p.contains(view)));
        }
    }
}
