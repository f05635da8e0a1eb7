//! Shared data models
//!
//! Types that cross layer boundaries: the normalized span record produced by
//! ingest validation and consumed by the writer, and the aggregation results
//! produced by the query repositories and serialized by the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

// ============================================================================
// SPAN RECORD
// ============================================================================

/// Normalized span record, one row in the `spans` hypertable.
///
/// Cost and token fields carry `Option` end to end: `None` means the client
/// did not report the value (unknown), which is distinct from a reported
/// zero. Unknowns are persisted as SQL NULL and never folded into sums.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    /// Span end time; the row's position on the time axis.
    pub time: DateTime<Utc>,
    pub trace_id: String,
    pub span_id: String,
    pub span_name: String,
    /// `hikari.pipeline_id` attribute, defaulted to `trace_id` at ingest.
    pub pipeline_id: String,
    pub stage: String,
    pub model: String,
    pub provider: String,
    pub tokens_input: Option<i64>,
    pub tokens_output: Option<i64>,
    pub cost_input: Option<f64>,
    pub cost_output: Option<f64>,
    pub cost_total: Option<f64>,
    pub duration_ms: f64,
}

// ============================================================================
// PIPELINE AGGREGATION RESULTS
// ============================================================================

/// One `(stage, model, provider)` group within a pipeline cost breakdown.
///
/// Cost fields are `None` when every span in the group left them unknown;
/// a populated value sums only the spans that reported one.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StageCost {
    pub stage: String,
    pub model: String,
    pub provider: String,
    pub tokens_input: Option<i64>,
    pub tokens_output: Option<i64>,
    pub cost_input: Option<f64>,
    pub cost_output: Option<f64>,
    pub cost_total: Option<f64>,
    pub span_count: i64,
}

/// Full cost breakdown for one pipeline.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineCost {
    pub pipeline_id: String,
    /// Sum of the known `cost_total` values; 0.0 when none are known.
    pub total_cost: f64,
    /// True iff at least one span has an unknown `cost_total`.
    pub is_partial: bool,
    /// Fraction of spans with a known `cost_total`, in [0, 1].
    pub coverage_ratio: f64,
    pub stages: Vec<StageCost>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// One row of the pipeline listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineSummary {
    pub pipeline_id: String,
    pub total_cost: f64,
    pub is_partial: bool,
    pub span_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

// ============================================================================
// COST TRENDING
// ============================================================================

/// One time bucket of the cost trend.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrendBucket {
    pub timestamp: DateTime<Utc>,
    pub total_cost: f64,
    pub request_count: i64,
    pub avg_cost_per_request: f64,
    pub breakdown: Vec<BreakdownEntry>,
}

/// Per-group share of a bucket's cost.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BreakdownEntry {
    pub key: String,
    pub cost: f64,
    /// Share of the bucket's total cost, percent, one decimal.
    pub percentage: f64,
}

/// Time bucketing granularity for trending queries.
///
/// Each variant maps onto one continuous aggregate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendInterval {
    Hour,
    Day,
    Week,
}

impl TrendInterval {
    /// The continuous aggregate backing this granularity.
    pub fn view_name(&self) -> &'static str {
        match self {
            Self::Hour => "cost_hourly",
            Self::Day => "cost_daily",
            Self::Week => "cost_weekly",
        }
    }

    /// Bucket width in seconds.
    pub fn width_secs(&self) -> i64 {
        match self {
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
        }
    }
}

impl FromStr for TrendInterval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TrendInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
        }
    }
}

/// Grouping dimension for the trend breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendGroupBy {
    Model,
    Provider,
    Stage,
}

impl TrendGroupBy {
    /// The `spans` column (and continuous-aggregate column) to group on.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Provider => "provider",
            Self::Stage => "stage",
        }
    }
}

impl FromStr for TrendGroupBy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Self::Model),
            "provider" => Ok(Self::Provider),
            "stage" => Ok(Self::Stage),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TrendGroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}
