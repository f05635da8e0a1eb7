//! OTLP-JSON trace envelope decoding
//!
//! Models the accepted subset of the OTLP JSON encoding:
//! `{resourceSpans: [{scopeSpans: [{spans: [...]}]}]}` with per-span
//! `{key, value}` attribute pairs. Numeric wire quirks are absorbed here:
//! 64-bit integers arrive as decimal strings (proto3 JSON) or as plain JSON
//! numbers, and doubles may arrive as integer-valued numbers.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTraceRequest {
    #[serde(default)]
    pub resource_spans: Vec<ResourceSpans>,
}

impl ExportTraceRequest {
    /// Iterate every span in the envelope in payload order.
    pub fn spans(&self) -> impl Iterator<Item = &OtlpSpan> {
        self.resource_spans
            .iter()
            .flat_map(|rs| &rs.scope_spans)
            .flat_map(|ss| &ss.spans)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    #[serde(default)]
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    #[serde(default)]
    pub spans: Vec<OtlpSpan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpSpan {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_time_unix_nano: Option<JsonScalar>,
    #[serde(default)]
    pub end_time_unix_nano: Option<JsonScalar>,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: Option<AnyValue>,
}

/// Tagged union over the OTLP attribute value types the collector accepts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub int_value: Option<JsonScalar>,
    #[serde(default)]
    pub double_value: Option<JsonScalar>,
    #[serde(default)]
    pub bool_value: Option<bool>,
}

/// A JSON value that should be numeric but may be encoded as a number or a
/// decimal string, depending on the exporter. Anything else still decodes
/// (into `Other`) so one span's malformed field rejects that span rather
/// than failing the whole envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JsonScalar {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl JsonScalar {
    /// Coerce to an integer. Decimal strings parse; floats are accepted
    /// only when integer-valued.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e18 => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to an unsigned integer (timestamps).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v < 1.8e19 => Some(*v as u64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a float. Integers widen; decimal strings parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

/// A flattened, coerced attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl AttrValue {
    fn from_any(value: &AnyValue) -> Option<Self> {
        if let Some(s) = &value.string_value {
            return Some(Self::Str(s.clone()));
        }
        if let Some(scalar) = &value.int_value {
            // An unparseable intValue is kept as text so validation can
            // report a type mismatch instead of treating the key as absent.
            return Some(match scalar.as_i64() {
                Some(v) => Self::Int(v),
                None => Self::Str(scalar_text(scalar)),
            });
        }
        if let Some(scalar) = &value.double_value {
            return Some(match scalar.as_f64() {
                Some(v) => Self::Double(v),
                None => Self::Str(scalar_text(scalar)),
            });
        }
        value.bool_value.map(Self::Bool)
    }
}

fn scalar_text(scalar: &JsonScalar) -> String {
    match scalar {
        JsonScalar::Int(v) => v.to_string(),
        JsonScalar::Float(v) => v.to_string(),
        JsonScalar::Text(s) => s.clone(),
        JsonScalar::Other(v) => v.to_string(),
    }
}

/// Flatten an attribute list into a keyed map. Later duplicates win;
/// valueless pairs are skipped.
pub fn flatten_attributes(attributes: &[KeyValue]) -> HashMap<String, AttrValue> {
    let mut attrs = HashMap::with_capacity(attributes.len());
    for kv in attributes {
        if let Some(value) = kv.value.as_ref().and_then(AttrValue::from_any) {
            attrs.insert(kv.key.clone(), value);
        }
    }
    attrs
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
