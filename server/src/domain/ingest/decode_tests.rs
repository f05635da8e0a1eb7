//! Tests for OTLP-JSON envelope decoding

use super::*;

fn parse(json: &str) -> ExportTraceRequest {
    serde_json::from_str(json).expect("valid envelope")
}

#[test]
fn test_empty_envelope() {
    let request = parse(r#"{}"#);
    assert_eq!(request.spans().count(), 0);

    let request = parse(r#"{"resourceSpans": []}"#);
    assert_eq!(request.spans().count(), 0);
}

#[test]
fn test_nested_structure_flattened() {
    let request = parse(
        r#"{
            "resourceSpans": [
                {"scopeSpans": [
                    {"spans": [{"traceId": "t1", "spanId": "s1", "name": "a"}]},
                    {"spans": [{"traceId": "t1", "spanId": "s2", "name": "b"}]}
                ]},
                {"scopeSpans": [
                    {"spans": [{"traceId": "t2", "spanId": "s3", "name": "c"}]}
                ]}
            ]
        }"#,
    );

    let ids: Vec<&str> = request.spans().map(|s| s.span_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
}

#[test]
fn test_unknown_fields_ignored() {
    let request = parse(
        r#"{
            "resourceSpans": [{
                "resource": {"attributes": []},
                "scopeSpans": [{
                    "scope": {"name": "my-sdk"},
                    "spans": [{"traceId": "t", "spanId": "s", "name": "x", "kind": 3}]
                }]
            }]
        }"#,
    );
    assert_eq!(request.spans().count(), 1);
}

#[test]
fn test_timestamps_as_string_and_number() {
    let request = parse(
        r#"{
            "resourceSpans": [{"scopeSpans": [{"spans": [
                {
                    "traceId": "t", "spanId": "s", "name": "x",
                    "startTimeUnixNano": "1704067200000000000",
                    "endTimeUnixNano": 1704067201000000000
                }
            ]}]}]
        }"#,
    );

    let span = request.spans().next().unwrap();
    assert_eq!(
        span.start_time_unix_nano.as_ref().unwrap().as_u64(),
        Some(1_704_067_200_000_000_000)
    );
    assert_eq!(
        span.end_time_unix_nano.as_ref().unwrap().as_u64(),
        Some(1_704_067_201_000_000_000)
    );
}

#[test]
fn test_int_value_decimal_string() {
    let scalar = JsonScalar::Text("1500".to_string());
    assert_eq!(scalar.as_i64(), Some(1500));

    let scalar = JsonScalar::Text("not-a-number".to_string());
    assert_eq!(scalar.as_i64(), None);
}

#[test]
fn test_double_accepts_integer_valued_number() {
    assert_eq!(JsonScalar::Int(3).as_f64(), Some(3.0));
    assert_eq!(JsonScalar::Float(0.00075).as_f64(), Some(0.00075));
}

#[test]
fn test_int_rejects_fractional_float() {
    assert_eq!(JsonScalar::Float(1.5).as_i64(), None);
    assert_eq!(JsonScalar::Float(2.0).as_i64(), Some(2));
}

#[test]
fn test_flatten_attributes_coercion() {
    let attrs: Vec<KeyValue> = serde_json::from_str(
        r#"[
            {"key": "hikari.stage", "value": {"stringValue": "extract"}},
            {"key": "hikari.tokens.input", "value": {"intValue": "100"}},
            {"key": "hikari.tokens.output", "value": {"intValue": 50}},
            {"key": "hikari.cost.total", "value": {"doubleValue": 0.00075}},
            {"key": "hikari.cost.input", "value": {"doubleValue": 1}},
            {"key": "flag", "value": {"boolValue": true}},
            {"key": "empty", "value": {}},
            {"key": "no-value"}
        ]"#,
    )
    .unwrap();

    let map = flatten_attributes(&attrs);
    assert_eq!(
        map.get("hikari.stage"),
        Some(&AttrValue::Str("extract".to_string()))
    );
    assert_eq!(map.get("hikari.tokens.input"), Some(&AttrValue::Int(100)));
    assert_eq!(map.get("hikari.tokens.output"), Some(&AttrValue::Int(50)));
    assert_eq!(
        map.get("hikari.cost.total"),
        Some(&AttrValue::Double(0.00075))
    );
    assert_eq!(map.get("hikari.cost.input"), Some(&AttrValue::Double(1.0)));
    assert_eq!(map.get("flag"), Some(&AttrValue::Bool(true)));
    assert!(!map.contains_key("empty"));
    assert!(!map.contains_key("no-value"));
}

#[test]
fn test_garbage_int_value_kept_as_text_for_mismatch_reporting() {
    let attrs: Vec<KeyValue> = serde_json::from_str(
        r#"[{"key": "hikari.tokens.input", "value": {"intValue": "lots"}}]"#,
    )
    .unwrap();

    let map = flatten_attributes(&attrs);
    assert_eq!(
        map.get("hikari.tokens.input"),
        Some(&AttrValue::Str("lots".to_string()))
    );
}

#[test]
fn test_non_scalar_timestamp_decodes_without_failing_envelope() {
    let request = parse(
        r#"{
            "resourceSpans": [{"scopeSpans": [{"spans": [
                {"traceId": "t", "spanId": "s", "name": "x", "endTimeUnixNano": true}
            ]}]}]
        }"#,
    );

    let span = request.spans().next().unwrap();
    assert_eq!(span.end_time_unix_nano.as_ref().unwrap().as_u64(), None);
}

#[test]
fn test_malformed_envelope_fails() {
    assert!(serde_json::from_str::<ExportTraceRequest>("not json").is_err());
    assert!(serde_json::from_str::<ExportTraceRequest>(r#"{"resourceSpans": "nope"}"#).is_err());
}
