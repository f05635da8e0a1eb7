//! Trending repository: time-bucketed cost reads over the continuous aggregates
//!
//! The SQL side only fetches pre-bucketed rows; the grid fill, breakdown
//! ranking, and top-N truncation happen in `assemble_buckets` so they can be
//! tested without a database.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use super::read_deadline;
use crate::data::postgres::PostgresError;
use crate::data::types::{BreakdownEntry, TrendBucket, TrendGroupBy, TrendInterval};

/// Breakdown entries beyond this rank collapse into a synthetic "other" row.
const BREAKDOWN_TOP_N: usize = 20;

type TrendRow = (DateTime<Utc>, String, Option<f64>, i64);

/// Read the continuous aggregate matching `interval` and assemble one bucket
/// per grid step in `[start, end)`, empty buckets included.
pub async fn get_cost_trending(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: TrendInterval,
    group_by: TrendGroupBy,
) -> Result<Vec<TrendBucket>, PostgresError> {
    // View and column names come from closed enums, never from user input.
    let sql = format!(
        "SELECT bucket, {key} AS key, SUM(cost_total) AS cost, \
         SUM(span_count)::BIGINT AS span_count \
         FROM {view} \
         WHERE bucket >= $1 AND bucket < $2 \
         GROUP BY bucket, {key} \
         ORDER BY bucket ASC",
        key = group_by.column(),
        view = interval.view_name(),
    );

    let rows: Vec<TrendRow> = read_deadline(
        sqlx::query_as(&sql)
            .bind(bucket_floor(start, interval))
            .bind(end)
            .fetch_all(pool),
    )
    .await?;

    Ok(assemble_buckets(start, end, interval, rows))
}

/// Align a timestamp to its bucket start the way `time_bucket` does:
/// hours and days from the Unix epoch, weeks starting Monday.
fn bucket_floor(ts: DateTime<Utc>, interval: TrendInterval) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let width = interval.width_secs();
    let origin = match interval {
        // 1970-01-05 was a Monday; weekly buckets align to it.
        TrendInterval::Week => 4 * 86_400,
        _ => 0,
    };
    let floored = secs - (secs - origin).rem_euclid(width);
    Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
}

/// Build the bucket list: every grid step emitted, per-bucket totals summed
/// over groups, breakdown ranked by cost with ties broken by key, truncated
/// to the top 20 plus an aggregated "other" entry.
fn assemble_buckets(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: TrendInterval,
    rows: Vec<TrendRow>,
) -> Vec<TrendBucket> {
    let mut grouped: BTreeMap<DateTime<Utc>, Vec<(String, f64, i64)>> = BTreeMap::new();
    for (bucket, key, cost, span_count) in rows {
        grouped
            .entry(bucket)
            .or_default()
            .push((key, cost.unwrap_or(0.0), span_count));
    }

    let width = chrono::Duration::seconds(interval.width_secs());
    let mut buckets = Vec::new();
    let mut cursor = bucket_floor(start, interval);

    while cursor < end {
        let entries = grouped.remove(&cursor).unwrap_or_default();
        buckets.push(build_bucket(cursor, entries));
        cursor += width;
    }

    buckets
}

fn build_bucket(timestamp: DateTime<Utc>, mut entries: Vec<(String, f64, i64)>) -> TrendBucket {
    let total_cost: f64 = entries.iter().map(|(_, cost, _)| cost).sum();
    let request_count: i64 = entries.iter().map(|(_, _, count)| count).sum();
    let avg_cost_per_request = if request_count > 0 {
        total_cost / request_count as f64
    } else {
        0.0
    };

    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut breakdown: Vec<BreakdownEntry> = Vec::with_capacity(entries.len().min(BREAKDOWN_TOP_N + 1));
    let mut other_cost = 0.0;
    let mut has_other = false;
    for (rank, (key, cost, _)) in entries.into_iter().enumerate() {
        if rank < BREAKDOWN_TOP_N {
            breakdown.push(BreakdownEntry {
                key,
                cost,
                percentage: percentage_of(cost, total_cost),
            });
        } else {
            other_cost += cost;
            has_other = true;
        }
    }
    if has_other {
        breakdown.push(BreakdownEntry {
            key: "other".to_string(),
            cost: other_cost,
            percentage: percentage_of(other_cost, total_cost),
        });
    }

    TrendBucket {
        timestamp,
        total_cost,
        request_count,
        avg_cost_per_request,
        breakdown,
    }
}

/// Share of `total`, in percent, rounded to one decimal.
fn percentage_of(cost: f64, total: f64) -> f64 {
    if total > 0.0 {
        (cost / total * 1000.0).round() / 10.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn at(iso: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(iso)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_bucket_floor_hour() {
        assert_eq!(
            bucket_floor(at("2024-03-05T10:47:31Z"), TrendInterval::Hour),
            at("2024-03-05T10:00:00Z")
        );
    }

    #[test]
    fn test_bucket_floor_day() {
        assert_eq!(
            bucket_floor(at("2024-03-05T10:47:31Z"), TrendInterval::Day),
            at("2024-03-05T00:00:00Z")
        );
    }

    #[test]
    fn test_bucket_floor_week_lands_on_monday() {
        // 2024-03-05 is a Tuesday; its week bucket starts Monday 2024-03-04.
        let floored = bucket_floor(at("2024-03-05T10:47:31Z"), TrendInterval::Week);
        assert_eq!(floored, at("2024-03-04T00:00:00Z"));
        assert_eq!(floored.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_single_bucket_even_split() {
        let rows = vec![
            (at("2024-03-05T10:00:00Z"), "model-a".to_string(), Some(0.05), 5),
            (at("2024-03-05T10:00:00Z"), "model-b".to_string(), Some(0.05), 5),
        ];
        let buckets = assemble_buckets(
            at("2024-03-05T10:00:00Z"),
            at("2024-03-05T11:00:00Z"),
            TrendInterval::Hour,
            rows,
        );

        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert!((bucket.total_cost - 0.10).abs() < 1e-12);
        assert_eq!(bucket.request_count, 10);
        assert!((bucket.avg_cost_per_request - 0.01).abs() < 1e-12);
        assert_eq!(bucket.breakdown.len(), 2);
        assert_eq!(bucket.breakdown[0].key, "model-a");
        assert_eq!(bucket.breakdown[0].percentage, 50.0);
        assert_eq!(bucket.breakdown[1].percentage, 50.0);
    }

    #[test]
    fn test_empty_buckets_emitted() {
        let rows = vec![(
            at("2024-03-05T10:00:00Z"),
            "model-a".to_string(),
            Some(0.02),
            2,
        )];
        let buckets = assemble_buckets(
            at("2024-03-05T09:00:00Z"),
            at("2024-03-05T12:00:00Z"),
            TrendInterval::Hour,
            rows,
        );

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].timestamp, at("2024-03-05T09:00:00Z"));
        assert_eq!(buckets[0].request_count, 0);
        assert_eq!(buckets[0].total_cost, 0.0);
        assert_eq!(buckets[0].avg_cost_per_request, 0.0);
        assert!(buckets[0].breakdown.is_empty());
        assert_eq!(buckets[1].request_count, 2);
        assert_eq!(buckets[2].request_count, 0);
    }

    #[test]
    fn test_breakdown_sorted_by_cost_descending() {
        let bucket_time = at("2024-03-05T10:00:00Z");
        let rows = vec![
            (bucket_time, "cheap".to_string(), Some(0.01), 1),
            (bucket_time, "expensive".to_string(), Some(0.09), 1),
        ];
        let buckets = assemble_buckets(
            bucket_time,
            at("2024-03-05T11:00:00Z"),
            TrendInterval::Hour,
            rows,
        );

        let breakdown = &buckets[0].breakdown;
        assert_eq!(breakdown[0].key, "expensive");
        assert_eq!(breakdown[0].percentage, 90.0);
        assert_eq!(breakdown[1].key, "cheap");
        assert_eq!(breakdown[1].percentage, 10.0);
    }

    #[test]
    fn test_breakdown_truncated_to_top_20_with_other() {
        let bucket_time = at("2024-03-05T10:00:00Z");
        let rows: Vec<TrendRow> = (0..25)
            .map(|i| {
                (
                    bucket_time,
                    format!("model-{:02}", i),
                    Some(1.0 + i as f64),
                    1,
                )
            })
            .collect();
        let buckets = assemble_buckets(
            bucket_time,
            at("2024-03-05T11:00:00Z"),
            TrendInterval::Hour,
            rows,
        );

        let breakdown = &buckets[0].breakdown;
        assert_eq!(breakdown.len(), 21);
        assert_eq!(breakdown.last().unwrap().key, "other");
        // The five cheapest groups (costs 1..=5) collapse into "other".
        assert!((breakdown.last().unwrap().cost - 15.0).abs() < 1e-12);
        // Top entry is the most expensive group.
        assert_eq!(breakdown[0].key, "model-24");
    }

    #[test]
    fn test_percentage_rounds_to_one_decimal() {
        assert_eq!(percentage_of(1.0, 3.0), 33.3);
        assert_eq!(percentage_of(2.0, 3.0), 66.7);
        assert_eq!(percentage_of(0.0, 0.0), 0.0);
    }
}
