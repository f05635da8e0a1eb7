//! Span validation and normalization
//!
//! Turns decoded OTLP spans into `SpanRecord`s, one accept/reject decision
//! per span. Faults are isolated: a rejected span never affects its
//! siblings, and the handler reports each rejection with its reason.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::decode::{AttrValue, ExportTraceRequest, OtlpSpan, flatten_attributes};
use crate::data::types::SpanRecord;
use crate::utils::time::nanos_to_datetime;

// Attribute vocabulary accepted from clients. Unknown `hikari.*` keys and
// all other keys are dropped silently.
pub const ATTR_PIPELINE_ID: &str = "hikari.pipeline_id";
pub const ATTR_STAGE: &str = "hikari.stage";
pub const ATTR_MODEL: &str = "hikari.model";
pub const ATTR_PROVIDER: &str = "hikari.provider";
pub const ATTR_TOKENS_INPUT: &str = "hikari.tokens.input";
pub const ATTR_TOKENS_OUTPUT: &str = "hikari.tokens.output";
pub const ATTR_COST_INPUT: &str = "hikari.cost.input";
pub const ATTR_COST_OUTPUT: &str = "hikari.cost.output";
pub const ATTR_COST_TOTAL: &str = "hikari.cost.total";

/// Tolerance for comparing a reported `cost.total` with the sum of its
/// components.
const COST_SUM_TOLERANCE: f64 = 1e-9;

/// Why a span was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing required attribute {0}")]
    MissingAttribute(&'static str),

    #[error("invalid value for attribute {0}")]
    InvalidAttribute(&'static str),

    #[error("missing or unparseable {0} timestamp")]
    InvalidTimestamp(&'static str),

    #[error("missing span id")]
    MissingSpanId,

    #[error("missing trace id")]
    MissingTraceId,
}

/// A rejected span and the reason, as reported in the 207 response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRejection {
    pub span_id: String,
    pub reason: RejectReason,
}

impl fmt::Display for SpanRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = if self.span_id.is_empty() {
            "<unknown>"
        } else {
            self.span_id.as_str()
        };
        write!(f, "span {}: {}", id, self.reason)
    }
}

/// Result of validating one ingestion request.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub accepted: Vec<SpanRecord>,
    pub rejections: Vec<SpanRejection>,
}

/// Validate every span in the envelope, preserving payload order among the
/// accepted records.
pub fn process_request(request: &ExportTraceRequest) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for span in request.spans() {
        match validate_span(span) {
            Ok(record) => outcome.accepted.push(record),
            Err(rejection) => {
                tracing::debug!(
                    span_id = %rejection.span_id,
                    reason = %rejection.reason,
                    "Rejected span"
                );
                outcome.rejections.push(rejection);
            }
        }
    }
    outcome
}

/// Validate one span against the attribute contract.
pub fn validate_span(span: &OtlpSpan) -> Result<SpanRecord, SpanRejection> {
    let reject = |reason: RejectReason| SpanRejection {
        span_id: span.span_id.clone(),
        reason,
    };

    if span.span_id.is_empty() {
        return Err(reject(RejectReason::MissingSpanId));
    }
    if span.trace_id.is_empty() {
        return Err(reject(RejectReason::MissingTraceId));
    }

    let attrs = flatten_attributes(&span.attributes);

    let stage = required_str(&attrs, ATTR_STAGE).map_err(&reject)?;
    let model = required_str(&attrs, ATTR_MODEL).map_err(&reject)?;
    let provider = required_str(&attrs, ATTR_PROVIDER).map_err(&reject)?;

    let end_nanos = span
        .end_time_unix_nano
        .as_ref()
        .and_then(|s| s.as_u64())
        .filter(|n| *n > 0)
        .ok_or_else(|| reject(RejectReason::InvalidTimestamp("end")))?;
    let start_nanos = span
        .start_time_unix_nano
        .as_ref()
        .and_then(|s| s.as_u64())
        .filter(|n| *n > 0)
        .ok_or_else(|| reject(RejectReason::InvalidTimestamp("start")))?;
    // Rows carry time at millisecond precision; sub-ms input is truncated.
    let time = nanos_to_datetime(end_nanos - end_nanos % 1_000_000)
        .ok_or_else(|| reject(RejectReason::InvalidTimestamp("end")))?;

    let duration_ms = if end_nanos > start_nanos {
        (end_nanos - start_nanos) as f64 / 1_000_000.0
    } else {
        0.0
    };

    let pipeline_id = match optional_str(&attrs, ATTR_PIPELINE_ID).map_err(&reject)? {
        Some(id) => id,
        None => span.trace_id.clone(),
    };

    let tokens_input = optional_count(&attrs, ATTR_TOKENS_INPUT).map_err(&reject)?;
    let tokens_output = optional_count(&attrs, ATTR_TOKENS_OUTPUT).map_err(&reject)?;

    let cost_input = optional_cost(&attrs, ATTR_COST_INPUT).map_err(&reject)?;
    let cost_output = optional_cost(&attrs, ATTR_COST_OUTPUT).map_err(&reject)?;
    let cost_total = optional_cost(&attrs, ATTR_COST_TOTAL).map_err(&reject)?;
    let (cost_input, cost_output, cost_total) =
        normalize_costs(cost_input, cost_output, cost_total);

    Ok(SpanRecord {
        time,
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        span_name: span.name.clone(),
        pipeline_id,
        stage,
        model,
        provider,
        tokens_input,
        tokens_output,
        cost_input,
        cost_output,
        cost_total,
        duration_ms,
    })
}

/// Reconcile reported costs so the stored record is internally consistent.
///
/// The total is the knowable quantity: when components are incomplete or
/// disagree with a reported total, the components are dropped and the total
/// kept. When only the components are reported, the total is their sum. A
/// record never stores a non-null total alongside components that do not
/// add up to it, and never stores a total when a lone component leaves the
/// other side unknown.
pub(crate) fn normalize_costs(
    cost_input: Option<f64>,
    cost_output: Option<f64>,
    cost_total: Option<f64>,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    match (cost_input, cost_output, cost_total) {
        (Some(input), Some(output), Some(total)) => {
            if (input + output - total).abs() <= COST_SUM_TOLERANCE {
                (Some(input), Some(output), Some(total))
            } else {
                (None, None, Some(total))
            }
        }
        (_, _, Some(total)) => (None, None, Some(total)),
        (Some(input), Some(output), None) => (Some(input), Some(output), Some(input + output)),
        (input, output, None) => (input, output, None),
    }
}

fn required_str(
    attrs: &HashMap<String, AttrValue>,
    key: &'static str,
) -> Result<String, RejectReason> {
    match attrs.get(key) {
        Some(AttrValue::Str(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(RejectReason::InvalidAttribute(key)),
        None => Err(RejectReason::MissingAttribute(key)),
    }
}

fn optional_str(
    attrs: &HashMap<String, AttrValue>,
    key: &'static str,
) -> Result<Option<String>, RejectReason> {
    match attrs.get(key) {
        Some(AttrValue::Str(s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(_) => Err(RejectReason::InvalidAttribute(key)),
        None => Ok(None),
    }
}

/// Optional non-negative integer (token counts).
fn optional_count(
    attrs: &HashMap<String, AttrValue>,
    key: &'static str,
) -> Result<Option<i64>, RejectReason> {
    match attrs.get(key) {
        Some(AttrValue::Int(v)) if *v >= 0 => Ok(Some(*v)),
        Some(_) => Err(RejectReason::InvalidAttribute(key)),
        None => Ok(None),
    }
}

/// Optional non-negative float (USD costs). Integer-valued wire numbers
/// have already been widened by the decoder.
fn optional_cost(
    attrs: &HashMap<String, AttrValue>,
    key: &'static str,
) -> Result<Option<f64>, RejectReason> {
    match attrs.get(key) {
        Some(AttrValue::Double(v)) if v.is_finite() && *v >= 0.0 => Ok(Some(*v)),
        Some(AttrValue::Int(v)) if *v >= 0 => Ok(Some(*v as f64)),
        Some(_) => Err(RejectReason::InvalidAttribute(key)),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
