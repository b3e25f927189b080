//! JSON span formatter.
//!
//! One exported span becomes one JSON object. Ids use OTLP's hex spelling so
//! files can be correlated with collector output; attributes are flattened
//! into a plain object keyed by attribute name.

use opentelemetry::trace::{SpanId, Status};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;
use serde_json::{Map, Value as JsonValue};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub struct SpanFormatter {
    service: String,
}

impl SpanFormatter {
    /// Uses the resource's `service.name`, if any, to tag every record.
    pub fn new(resource: &Resource) -> Self {
        let service = resource
            .iter()
            .find(|(key, _)| key.as_str() == "service.name")
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();
        Self { service }
    }

    pub fn format_span(&self, span: &SpanData) -> JsonValue {
        let parent = if span.parent_span_id == SpanId::INVALID {
            JsonValue::Null
        } else {
            JsonValue::String(format!("{:016x}", span.parent_span_id))
        };
        let duration = span.end_time.duration_since(span.start_time).unwrap_or_default();

        let events: Vec<JsonValue> = span
            .events
            .iter()
            .map(|event| {
                serde_json::json!({
                    "name": event.name,
                    "timeUnixNano": unix_nanos(event.timestamp),
                    "attributes": attributes(&event.attributes),
                })
            })
            .collect();

        let mut record = serde_json::json!({
            "service": self.service,
            "traceId": format!("{:032x}", span.span_context.trace_id()),
            "spanId": format!("{:016x}", span.span_context.span_id()),
            "parentSpanId": parent,
            "name": span.name,
            "startTimeUnixNano": unix_nanos(span.start_time),
            "durationMicros": u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            "attributes": attributes(&span.attributes),
            "events": events,
        });

        if let Status::Error { description } = &span.status {
            record["error"] = JsonValue::String(description.to_string());
        }
        record
    }
}

impl std::fmt::Debug for SpanFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanFormatter").field("service", &self.service).finish()
    }
}

fn attributes(attributes: &[KeyValue]) -> JsonValue {
    let map: Map<String, JsonValue> = attributes
        .iter()
        .map(|kv| (kv.key.to_string(), attribute_value(&kv.value)))
        .collect();
    JsonValue::Object(map)
}

fn attribute_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::I64(i) => JsonValue::from(*i),
        Value::F64(f) => JsonValue::from(*f),
        Value::String(s) => JsonValue::String(s.to_string()),
        Value::Array(_) => JsonValue::String(value.to_string()),
    }
}

/// Nanoseconds since the epoch as a string; JSON numbers lose precision.
fn unix_nanos(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_values_keep_their_json_type() {
        let attrs = vec![
            KeyValue::new("seq", 3_i64),
            KeyValue::new("loading", true),
            KeyValue::new("keyword", "cat"),
        ];
        assert_eq!(
            attributes(&attrs),
            serde_json::json!({"seq": 3, "loading": true, "keyword": "cat"})
        );
    }

    #[test]
    fn service_name_comes_from_resource() {
        let resource = Resource::new(vec![KeyValue::new("service.name", "feedsync")]);
        assert_eq!(SpanFormatter::new(&resource).service, "feedsync");
    }

    #[test]
    fn epoch_nanos_are_strings() {
        assert_eq!(unix_nanos(UNIX_EPOCH + Duration::from_micros(5)), "5000");
    }
}
