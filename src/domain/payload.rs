//! Input payloads and change detection.

use serde_json::{Map, Value};
use thiserror::Error;

/// Field whose value decides whether a payload is new work.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Absent timestamps compare as the empty string.
static MISSING_TIMESTAMP: Value = Value::String(String::new());

/// Errors raised while decoding a raw input value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Input is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Input must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// A decoded input payload: a JSON object of (normally scalar) values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputPayload(Map<String, Value>);

impl InputPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Decode raw bytes read from the store.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        match serde_json::from_slice::<Value>(raw)? {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(DecodeError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric field as `f64`, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The declared timestamp, if any.
    pub fn timestamp(&self) -> Option<&Value> {
        self.0.get(TIMESTAMP_FIELD)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn timestamp_marker(&self) -> &Value {
        self.timestamp().unwrap_or(&MISSING_TIMESTAMP)
    }
}

impl From<Map<String, Value>> for InputPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Result of comparing a payload against the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDetection {
    Changed,
    Unchanged,
}

impl ChangeDetection {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Last payload that completed a cycle, kept for change detection only.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    last: Option<InputPayload>,
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unchanged iff the timestamps are equal. The first payload is always
    /// changed.
    pub fn detect(&self, next: &InputPayload) -> ChangeDetection {
        match &self.last {
            Some(last) if last.timestamp_marker() == next.timestamp_marker() => {
                ChangeDetection::Unchanged
            }
            _ => ChangeDetection::Changed,
        }
    }

    /// Replace the snapshot with a processed payload.
    pub fn record(&mut self, payload: InputPayload) {
        self.last = Some(payload);
    }

    pub fn last(&self) -> Option<&InputPayload> {
        self.last.as_ref()
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn payload(value: Value) -> InputPayload {
        match value {
            Value::Object(fields) => InputPayload::new(fields),
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn decode_accepts_object() {
        let decoded = InputPayload::decode(br#"{"timestamp": "t1", "cpu_percent-0": 12.5}"#).unwrap();
        assert_eq!(decoded.timestamp(), Some(&json!("t1")));
        assert_eq!(decoded.get_f64("cpu_percent-0"), Some(12.5));
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = InputPayload::decode(b"{not json");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn decode_rejects_non_object() {
        let result = InputPayload::decode(b"[1, 2, 3]");
        assert!(matches!(result, Err(DecodeError::NotAnObject { found: "array" })));
    }

    #[test]
    fn first_payload_is_always_changed() {
        let snapshot = InputSnapshot::new();
        assert_eq!(
            snapshot.detect(&payload(json!({"timestamp": "t1"}))),
            ChangeDetection::Changed
        );
    }

    #[test]
    fn same_timestamp_is_unchanged_even_if_values_differ() {
        let mut snapshot = InputSnapshot::new();
        snapshot.record(payload(json!({"timestamp": "t1", "cpu": 1})));

        let next = payload(json!({"timestamp": "t1", "cpu": 99}));
        assert_eq!(snapshot.detect(&next), ChangeDetection::Unchanged);
    }

    #[test]
    fn different_timestamp_is_changed() {
        let mut snapshot = InputSnapshot::new();
        snapshot.record(payload(json!({"timestamp": "t1"})));

        assert!(snapshot.detect(&payload(json!({"timestamp": "t2"}))).is_changed());
    }

    #[test]
    fn missing_timestamp_compares_as_empty_string() {
        let mut snapshot = InputSnapshot::new();
        snapshot.record(payload(json!({"cpu": 1})));

        assert_eq!(
            snapshot.detect(&payload(json!({"cpu": 2}))),
            ChangeDetection::Unchanged
        );
        assert_eq!(
            snapshot.detect(&payload(json!({"timestamp": ""}))),
            ChangeDetection::Unchanged
        );
        assert!(snapshot
            .detect(&payload(json!({"timestamp": "t1"})))
            .is_changed());
    }

    proptest! {
        #[test]
        fn unchanged_iff_timestamps_equal(a in "[a-z0-9:-]{0,12}", b in "[a-z0-9:-]{0,12}") {
            let mut snapshot = InputSnapshot::new();
            snapshot.record(payload(json!({ "timestamp": a.clone() })));

            let detection = snapshot.detect(&payload(json!({ "timestamp": b.clone() })));
            prop_assert_eq!(detection == ChangeDetection::Unchanged, a == b);
        }
    }
}
