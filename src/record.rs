use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::utils::strip_line_breaks;

/// How the broker assigned a record's timestamp.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampType {
    CreateTime,
    LogAppendTime,
    #[default]
    NotAvailable,
}

/// Result of classifying one payload, kept in two stages so tests can tell a
/// misclassified-but-safely-handled payload apart from a correctly classified
/// one. The public record surface only carries the final strings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Classification {
    pub is_json: bool,
    pub parse_succeeded: bool,
    pub compressed: String,
    pub formatted: String,
}

/// Classifies a payload and produces its two renderings.
///
/// Detection is a cheap structural heuristic, not a parse: the trimmed payload
/// counts as JSON iff its outer characters are a matching bracket pair. A
/// false positive (e.g. `{not valid json}`) fails the later parse and falls
/// back to the unmodified text, so it still renders legibly.
pub(crate) fn classify(payload: &str) -> Classification {
    let trimmed = payload.trim();
    let is_json = (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'));

    if !is_json {
        return Classification {
            is_json,
            parse_succeeded: false,
            compressed: trimmed.to_string(),
            formatted: payload.to_string(),
        };
    }

    // The single-line rendering works over the line-break-stripped text, the
    // indented one over the original payload.
    let stripped = strip_line_breaks(trimmed);
    let (parse_succeeded, compressed) = match serde_json::from_str::<serde_json::Value>(&stripped) {
        Ok(value) => {
            let single_line = serde_json::to_string(&value).unwrap_or_else(|_| stripped.clone());
            (true, single_line)
        }
        Err(error) => {
            debug!(%error, "payload looked like JSON but did not parse, rendering as-is");
            (false, stripped)
        }
    };
    let formatted = serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| payload.to_string());

    Classification { is_json, parse_succeeded, compressed, formatted }
}

/// One side (key or value) of a record, classified and rendered.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PayloadView {
    /// The decoded payload as received; `None` for a null payload.
    pub raw: Option<String>,

    /// Serialized byte count as reported by the platform, clamped to zero
    /// (the client libraries report -1 for a null payload).
    pub size_in_bytes: i64,

    /// Whether the payload reference itself was null, independent of size.
    pub is_null: bool,

    /// Outcome of the structural JSON heuristic.
    pub is_json: bool,

    /// Canonical single-line rendering.
    pub compressed: String,

    /// Indented rendering.
    pub formatted: String,
}

impl PayloadView {
    /// Builds the view for one payload side from the decoded text and the
    /// platform-reported serialized size.
    pub fn new(raw: Option<String>, reported_size: i64) -> Self {
        let size_in_bytes = reported_size.max(0);
        match raw {
            None => PayloadView { size_in_bytes, is_null: true, ..PayloadView::default() },
            Some(text) => {
                let classification = classify(&text);
                PayloadView {
                    raw: Some(text),
                    size_in_bytes,
                    is_null: false,
                    is_json: classification.is_json,
                    compressed: classification.compressed,
                    formatted: classification.formatted,
                }
            }
        }
    }
}

/// A consumed message as handed over by the consumer client, before
/// normalisation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Epoch millis; negative means the broker reported no timestamp.
    pub timestamp_millis: i64,
    pub timestamp_type: TimestampType,
    pub key: Option<String>,
    pub value: Option<String>,
    /// Serialized sizes as reported by the client, -1 for null payloads.
    pub key_size: i64,
    pub value_size: i64,
    /// Header occurrences in wire order, duplicates included.
    pub headers: Vec<(String, String)>,
}

/// A record as originally handed to the producer client.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProducerRecord {
    pub topic: String,
    pub key: Option<String>,
    pub value: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// The broker's acknowledgment of a published record: where it landed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PublishAck {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp_millis: i64,
}

/// A decoded message, normalised for display and export.
///
/// Two construction paths converge on this shape: [`Record::from_consumed`]
/// for messages read off a topic, and [`Record::from_publish`] for the
/// echo of a just-published record. [`Record::end_of_stream`] builds the
/// terminal sentinel that marks the end of a consumption sequence; it never
/// comes out of the normal constructors.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    pub timestamp: Option<DateTime<Utc>>,
    pub timestamp_type: TimestampType,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: PayloadView,
    pub value: PayloadView,

    /// First occurrence wins when the wire carries duplicate header keys.
    pub headers: BTreeMap<String, String>,

    /// End-of-stream sentinel marker.
    pub last: bool,
}

impl Record {
    /// Normalises a message handed over by the consumer client.
    pub fn from_consumed(message: ConsumedMessage) -> Self {
        Record {
            timestamp: timestamp_from_millis(message.timestamp_millis),
            timestamp_type: message.timestamp_type,
            topic: message.topic,
            partition: message.partition,
            offset: message.offset,
            key: PayloadView::new(message.key, message.key_size),
            value: PayloadView::new(message.value, message.value_size),
            headers: collect_headers(message.headers),
            last: false,
        }
    }

    /// Normalises a post-publish acknowledgment joined with the record that
    /// was originally submitted: the ack contributes placement and timestamp,
    /// the submitted record contributes payloads and headers.
    pub fn from_publish(ack: PublishAck, submitted: &ProducerRecord) -> Self {
        Record {
            timestamp: timestamp_from_millis(ack.timestamp_millis),
            timestamp_type: TimestampType::CreateTime,
            topic: ack.topic,
            partition: ack.partition,
            offset: ack.offset,
            key: PayloadView::new(submitted.key.clone(), serialized_size(submitted.key.as_deref())),
            value: PayloadView::new(
                submitted.value.clone(),
                serialized_size(submitted.value.as_deref()),
            ),
            headers: collect_headers(submitted.headers.clone()),
            last: false,
        }
    }

    /// The terminal sentinel: `last` set, everything else null or zero.
    pub fn end_of_stream() -> Self {
        Record { last: true, ..Record::default() }
    }

    /// Flat projection for export: every field rendered as a string, payloads
    /// in their single-line form, headers as one JSON object.
    pub fn to_dto(&self) -> BTreeMap<String, String> {
        let mut dto = BTreeMap::new();
        dto.insert("topic".to_string(), self.topic.clone());
        dto.insert("partition".to_string(), self.partition.to_string());
        dto.insert("offset".to_string(), self.offset.to_string());
        dto.insert(
            "timestamp".to_string(),
            self.timestamp.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
        );
        dto.insert("key".to_string(), self.key.compressed.clone());
        dto.insert("key_size".to_string(), self.key.size_in_bytes.to_string());
        dto.insert("value".to_string(), self.value.compressed.clone());
        dto.insert("value_size".to_string(), self.value.size_in_bytes.to_string());
        dto.insert(
            "headers".to_string(),
            serde_json::to_string(&self.headers).unwrap_or_default(),
        );
        dto
    }
}

fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis < 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// UTF-8 byte count of the payload the producer submitted, -1 for null,
/// mirroring what the client libraries report for consumed messages.
fn serialized_size(payload: Option<&str>) -> i64 {
    payload.map(|text| text.len() as i64).unwrap_or(-1)
}

fn collect_headers(headers: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut collected = BTreeMap::new();
    for (key, value) in headers {
        collected.entry(key).or_insert(value);
    }
    collected
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::utils::is_thread_safe;

    #[test]
    fn json_object_payload_is_classified_and_rendered() {
        let classification = classify("{\"name\":\"value\"}");
        assert!(classification.is_json);
        assert!(classification.parse_succeeded);
        assert_eq!(classification.compressed, "{\"name\":\"value\"}");
        assert!(classification.formatted.contains('\n'));
    }

    #[test]
    fn plain_text_passes_through_both_renderings() {
        let classification = classify("plain text");
        assert!(!classification.is_json);
        assert!(!classification.parse_succeeded);
        assert_eq!(classification.compressed, "plain text");
        assert_eq!(classification.formatted, "plain text");
    }

    #[test]
    fn heuristic_false_positive_falls_back_to_original_text() {
        let classification = classify("{not valid json}");
        assert!(classification.is_json);
        assert!(!classification.parse_succeeded);
        assert_eq!(classification.compressed, "{not valid json}");
        assert_eq!(classification.formatted, "{not valid json}");
    }

    #[rstest]
    #[case("[1, 2, 3]", true)]
    #[case("  {\"a\": 1}  ", true)]
    #[case("[unbalanced", false)]
    #[case("", false)]
    #[case("{", false)]
    #[case("null", false)]
    fn bracket_pair_heuristic(#[case] payload: &str, #[case] expected: bool) {
        assert_eq!(classify(payload).is_json, expected);
    }

    #[test]
    fn multi_line_json_compresses_to_a_single_line() {
        let payload = "{\n  \"a\": 1,\n  \"b\": [2, 3]\n}";
        let classification = classify(payload);
        assert!(classification.is_json);
        assert_eq!(classification.compressed, "{\"a\":1,\"b\":[2,3]}");

        // The two renderings differ only in whitespace.
        let compact: serde_json::Value =
            serde_json::from_str(&classification.compressed).unwrap();
        let pretty: serde_json::Value = serde_json::from_str(&classification.formatted).unwrap();
        let original: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(compact, original);
        assert_eq!(pretty, original);
    }

    #[test]
    fn classification_is_idempotent() {
        for payload in ["{\"k\":true}", "plain", "{broken}", "[1,\n2]"] {
            assert_eq!(classify(payload), classify(payload));
        }
    }

    #[rstest]
    #[case(-1, 0)]
    #[case(0, 0)]
    #[case(42, 42)]
    fn reported_size_is_clamped(#[case] reported: i64, #[case] expected: i64) {
        let view = PayloadView::new(None, reported);
        assert_eq!(view.size_in_bytes, expected);
    }

    #[test]
    fn null_payload_view() {
        let view = PayloadView::new(None, -1);
        assert!(view.is_null);
        assert!(!view.is_json);
        assert!(view.raw.is_none());
        assert_eq!(view.compressed, "");
        assert_eq!(view.formatted, "");
    }

    fn consumed_message() -> ConsumedMessage {
        ConsumedMessage {
            topic: "orders".to_string(),
            partition: 2,
            offset: 77,
            timestamp_millis: 1_700_000_000_000,
            timestamp_type: TimestampType::CreateTime,
            key: Some("order-1".to_string()),
            value: Some("{\"total\": 9}".to_string()),
            key_size: 7,
            value_size: 12,
            headers: vec![
                ("dup".to_string(), "first".to_string()),
                ("dup".to_string(), "second".to_string()),
                ("trace".to_string(), "abc".to_string()),
            ],
        }
    }

    #[test]
    fn duplicate_header_keys_keep_the_first_value() {
        let record = Record::from_consumed(consumed_message());
        assert_eq!(record.headers.get("dup"), Some(&"first".to_string()));
        assert_eq!(record.headers.get("trace"), Some(&"abc".to_string()));
        assert_eq!(record.headers.len(), 2);
    }

    #[test]
    fn consumed_message_is_normalised() {
        let record = Record::from_consumed(consumed_message());
        assert_eq!(record.topic, "orders");
        assert_eq!(record.partition, 2);
        assert_eq!(record.offset, 77);
        assert!(!record.last);
        assert!(record.timestamp.is_some());
        assert!(!record.key.is_json);
        assert!(record.value.is_json);
        assert_eq!(record.value.compressed, "{\"total\":9}");
    }

    #[test]
    fn negative_broker_timestamp_means_none() {
        let message = ConsumedMessage { timestamp_millis: -1, ..consumed_message() };
        assert!(Record::from_consumed(message).timestamp.is_none());
    }

    #[test]
    fn publish_path_converges_on_the_consumed_shape() {
        let submitted = ProducerRecord {
            topic: "orders".to_string(),
            key: Some("order-1".to_string()),
            value: Some("{\"total\": 9}".to_string()),
            headers: vec![("trace".to_string(), "abc".to_string())],
        };
        let ack = PublishAck {
            topic: "orders".to_string(),
            partition: 2,
            offset: 77,
            timestamp_millis: 1_700_000_000_000,
        };

        let published = Record::from_publish(ack, &submitted);
        let consumed = Record::from_consumed(ConsumedMessage {
            headers: vec![("trace".to_string(), "abc".to_string())],
            ..consumed_message()
        });
        assert_eq!(published, consumed);
    }

    #[test]
    fn publish_path_reports_null_payload_sizes_as_zero() {
        let submitted = ProducerRecord { topic: "orders".to_string(), ..ProducerRecord::default() };
        let record = Record::from_publish(PublishAck::default(), &submitted);
        assert!(record.key.is_null);
        assert_eq!(record.key.size_in_bytes, 0);
        assert!(record.value.is_null);
        assert_eq!(record.value.size_in_bytes, 0);
    }

    #[test]
    fn end_of_stream_sentinel_is_inert() {
        let sentinel = Record::end_of_stream();
        assert!(sentinel.last);
        assert!(sentinel.topic.is_empty());
        assert!(sentinel.timestamp.is_none());
        assert!(sentinel.key.is_null || sentinel.key.raw.is_none());

        assert!(!Record::from_consumed(consumed_message()).last);
    }

    #[test]
    fn dto_projection_is_flat_and_complete() {
        let record = Record::from_consumed(consumed_message());
        let dto = record.to_dto();

        for key in
            ["topic", "partition", "offset", "timestamp", "key", "key_size", "value", "value_size", "headers"]
        {
            assert!(dto.contains_key(key), "missing dto key {key}");
        }
        assert_eq!(dto["topic"], "orders");
        assert_eq!(dto["partition"], "2");
        assert_eq!(dto["value"], "{\"total\":9}");
        assert_eq!(dto["value_size"], "12");

        let headers: BTreeMap<String, String> = serde_json::from_str(&dto["headers"]).unwrap();
        assert_eq!(headers, record.headers);
    }

    #[test]
    fn test_types_thread_safety() {
        is_thread_safe::<Record>();
        is_thread_safe::<PayloadView>();
        is_thread_safe::<ConsumedMessage>();
        is_thread_safe::<ProducerRecord>();
        is_thread_safe::<PublishAck>();
        is_thread_safe::<TimestampType>();
    }
}
