//! Consumer-side deliveries.
//!
//! A [`RawDelivery`] is what a broker hands to the consumer. It is turned into a
//! typed [`InboundMessage`] before normalization; a delivery that lacks the
//! correlation fields is rejected with a [`NormalizeError`] and dropped from
//! the measurement.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::broker::AttributeCarrier;
use crate::ids::TestRunId;
use crate::message::{envelope_keys, OutboundMessage};
use crate::record::MessageIdValue;

/// Errors raised while reading correlation fields from a delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Message body is not a JSON object: {0}")]
    InvalidBody(String),
}

/// A delivery as received from a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDelivery {
    /// Broker message properties / attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Opaque message body.
    #[serde(with = "body_base64", default)]
    pub body: Vec<u8>,
    /// Enqueue time assigned by the broker, if it exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_enqueued_time: Option<DateTime<Utc>>,
    /// Partition or session the broker delivered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<String>,
    /// Broker-level message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_message_id: Option<String>,
}

impl RawDelivery {
    /// Build the delivery a broker would hand out for `message`.
    ///
    /// With [`AttributeCarrier::Properties`] the envelope becomes the attribute
    /// map and the payload the body. With [`AttributeCarrier::Body`] the body is
    /// a JSON object holding the envelope plus the base64-encoded payload under
    /// `Content`, so binary payloads survive unchanged.
    pub fn from_outbound(
        message: &OutboundMessage,
        carrier: AttributeCarrier,
        system_enqueued_time: Option<DateTime<Utc>>,
    ) -> Self {
        let envelope = message.envelope();
        let (attributes, body) = match carrier {
            AttributeCarrier::Properties => (envelope, message.payload.to_vec()),
            AttributeCarrier::Body => {
                let mut document: serde_json::Map<String, Value> = envelope.into_iter().collect();
                document.insert(
                    envelope_keys::CONTENT.to_string(),
                    Value::String(STANDARD.encode(&message.payload)),
                );
                let body = serde_json::to_vec(&Value::Object(document)).unwrap_or_default();
                (BTreeMap::new(), body)
            }
        };

        Self {
            attributes,
            body,
            system_enqueued_time,
            partition_id: message.group_id.as_ref().map(|g| g.to_string()),
            broker_message_id: Some(message.broker_message_id()),
        }
    }
}

/// Typed view of a delivery, ready for normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub test_run_id: TestRunId,
    pub message_id: MessageIdValue,
    /// Time stamped by the producer.
    pub client_enqueue_time_utc: DateTime<Utc>,
    pub consumer_work_time_ms: Option<u32>,
    /// Time stamped by the broker, when available.
    pub system_enqueued_time: Option<DateTime<Utc>>,
    pub partition_id: Option<String>,
}

impl InboundMessage {
    /// Read the correlation fields out of a delivery.
    pub fn from_delivery(
        delivery: &RawDelivery,
        carrier: AttributeCarrier,
    ) -> Result<Self, NormalizeError> {
        match carrier {
            AttributeCarrier::Properties => Self::from_fields(&delivery.attributes, delivery),
            AttributeCarrier::Body => {
                let document: BTreeMap<String, Value> = serde_json::from_slice(&delivery.body)
                    .map_err(|e| NormalizeError::InvalidBody(e.to_string()))?;
                Self::from_fields(&document, delivery)
            }
        }
    }

    fn from_fields(
        fields: &BTreeMap<String, Value>,
        delivery: &RawDelivery,
    ) -> Result<Self, NormalizeError> {
        let test_run_id = match fields.get(envelope_keys::TEST_RUN_ID) {
            Some(Value::String(s)) if !s.is_empty() => TestRunId::from(s.as_str()),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(NormalizeError::MissingField(envelope_keys::TEST_RUN_ID))
            }
            Some(other) => {
                return Err(NormalizeError::InvalidField {
                    field: envelope_keys::TEST_RUN_ID,
                    reason: format!("expected string, got {other}"),
                })
            }
        };

        let message_id = match fields.get(envelope_keys::MESSAGE_ID) {
            Some(Value::Number(n)) => n.as_u64().map(MessageIdValue::Number).ok_or_else(|| {
                NormalizeError::InvalidField {
                    field: envelope_keys::MESSAGE_ID,
                    reason: format!("expected non-negative integer, got {n}"),
                }
            })?,
            // Attribute-only brokers transport numbers as strings.
            Some(Value::String(s)) => match s.parse::<u64>() {
                Ok(n) => MessageIdValue::Number(n),
                Err(_) => MessageIdValue::Text(s.clone()),
            },
            None | Some(Value::Null) => match &delivery.broker_message_id {
                Some(id) => MessageIdValue::Text(id.clone()),
                None => return Err(NormalizeError::MissingField(envelope_keys::MESSAGE_ID)),
            },
            Some(other) => {
                return Err(NormalizeError::InvalidField {
                    field: envelope_keys::MESSAGE_ID,
                    reason: format!("unsupported value {other}"),
                })
            }
        };

        let client_enqueue_time_utc = match fields.get(envelope_keys::ENQUEUE_TIME_UTC) {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| NormalizeError::InvalidField {
                    field: envelope_keys::ENQUEUE_TIME_UTC,
                    reason: e.to_string(),
                })?,
            None | Some(Value::Null) => {
                return Err(NormalizeError::MissingField(
                    envelope_keys::ENQUEUE_TIME_UTC,
                ))
            }
            Some(other) => {
                return Err(NormalizeError::InvalidField {
                    field: envelope_keys::ENQUEUE_TIME_UTC,
                    reason: format!("expected timestamp string, got {other}"),
                })
            }
        };

        let consumer_work_time_ms = match fields.get(envelope_keys::WORK_TIME) {
            None | Some(Value::Null) => None,
            Some(value) => parse_work_time(value)?,
        };

        let partition_id = delivery.partition_id.clone().or_else(|| {
            fields
                .get(envelope_keys::GROUP_ID)
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Ok(Self {
            test_run_id,
            message_id,
            client_enqueue_time_utc,
            consumer_work_time_ms,
            system_enqueued_time: delivery.system_enqueued_time,
            partition_id,
        })
    }

    /// RFC 3339 rendering of the producer timestamp, used in log output.
    pub fn client_enqueue_time_str(&self) -> String {
        self.client_enqueue_time_utc
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

fn parse_work_time(value: &Value) -> Result<Option<u32>, NormalizeError> {
    let invalid = |reason: String| NormalizeError::InvalidField {
        field: envelope_keys::WORK_TIME,
        reason,
    };
    let ms = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid(format!("expected integer, got {n}")))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| invalid(format!("{s:?}: {e}")))?,
        other => return Err(invalid(format!("unsupported value {other}"))),
    };
    if ms <= 0 {
        return Ok(None);
    }
    u32::try_from(ms)
        .map(Some)
        .map_err(|_| invalid(format!("{ms} is out of range")))
}

mod body_base64 {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DispatchGroup;
    use bytes::Bytes;

    fn outbound(message_id: u32, work_time: Option<u32>) -> OutboundMessage {
        let group = DispatchGroup::new(TestRunId::from("abc"), message_id, work_time);
        group
            .messages(true, &Bytes::from_static(b"payload"))
            .pop()
            .unwrap()
    }

    #[test]
    fn test_properties_carrier_roundtrip() {
        let message = outbound(7, Some(50));
        let delivery = RawDelivery::from_outbound(&message, AttributeCarrier::Properties, None);
        let inbound = InboundMessage::from_delivery(&delivery, AttributeCarrier::Properties).unwrap();

        assert_eq!(inbound.test_run_id.as_str(), "abc");
        assert_eq!(inbound.message_id, MessageIdValue::Number(7));
        assert_eq!(inbound.consumer_work_time_ms, Some(50));
        assert_eq!(inbound.client_enqueue_time_utc, message.enqueue_time_utc);
        assert_eq!(delivery.body, b"payload");
    }

    #[test]
    fn test_body_carrier_roundtrip() {
        let message = outbound(3, None);
        let now = Utc::now();
        let delivery = RawDelivery::from_outbound(&message, AttributeCarrier::Body, Some(now));
        assert!(delivery.attributes.is_empty());

        let inbound = InboundMessage::from_delivery(&delivery, AttributeCarrier::Body).unwrap();
        assert_eq!(inbound.message_id, MessageIdValue::Number(3));
        assert_eq!(inbound.consumer_work_time_ms, None);
        assert_eq!(inbound.system_enqueued_time, Some(now));
    }

    #[test]
    fn test_body_carrier_keeps_binary_payload() {
        let payload = Bytes::from_static(&[0x00, 0xff, 0xfe, b'{', 0x80]);
        let message = DispatchGroup::new(TestRunId::from("abc"), 1, None)
            .messages(false, &payload)
            .pop()
            .unwrap();
        let delivery = RawDelivery::from_outbound(&message, AttributeCarrier::Body, None);

        let document: Value = serde_json::from_slice(&delivery.body).unwrap();
        let content = document[envelope_keys::CONTENT].as_str().unwrap();
        assert_eq!(STANDARD.decode(content).unwrap(), payload.to_vec());
    }

    #[test]
    fn test_missing_test_run_id_is_rejected() {
        let mut delivery = RawDelivery::from_outbound(
            &outbound(1, None),
            AttributeCarrier::Properties,
            None,
        );
        delivery.attributes.remove(envelope_keys::TEST_RUN_ID);

        let err = InboundMessage::from_delivery(&delivery, AttributeCarrier::Properties).unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("TestRunId"));
    }

    #[test]
    fn test_missing_enqueue_time_is_rejected() {
        let mut delivery = RawDelivery::from_outbound(
            &outbound(1, None),
            AttributeCarrier::Properties,
            None,
        );
        delivery.attributes.remove(envelope_keys::ENQUEUE_TIME_UTC);

        let err = InboundMessage::from_delivery(&delivery, AttributeCarrier::Properties).unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("EnqueueTimeUtc"));
    }

    #[test]
    fn test_string_attributes_are_parsed() {
        let mut attributes = BTreeMap::new();
        attributes.insert("TestRunId".to_string(), Value::from("run-1"));
        attributes.insert("MessageId".to_string(), Value::from("12"));
        attributes.insert("workTime".to_string(), Value::from("25"));
        attributes.insert(
            "EnqueueTimeUtc".to_string(),
            Value::from("2024-01-01T00:00:00Z"),
        );
        let delivery = RawDelivery {
            attributes,
            body: Vec::new(),
            system_enqueued_time: None,
            partition_id: None,
            broker_message_id: None,
        };

        let inbound = InboundMessage::from_delivery(&delivery, AttributeCarrier::Properties).unwrap();
        assert_eq!(inbound.message_id, MessageIdValue::Number(12));
        assert_eq!(inbound.consumer_work_time_ms, Some(25));
    }

    #[test]
    fn test_falls_back_to_broker_message_id() {
        let mut delivery = RawDelivery::from_outbound(
            &outbound(4, None),
            AttributeCarrier::Properties,
            None,
        );
        delivery.attributes.remove(envelope_keys::MESSAGE_ID);
        let expected = delivery.broker_message_id.clone().unwrap();

        let inbound = InboundMessage::from_delivery(&delivery, AttributeCarrier::Properties).unwrap();
        assert_eq!(inbound.message_id, MessageIdValue::Text(expected));
    }

    #[test]
    fn test_non_json_body_is_rejected() {
        let delivery = RawDelivery {
            attributes: BTreeMap::new(),
            body: b"not json".to_vec(),
            system_enqueued_time: None,
            partition_id: None,
            broker_message_id: None,
        };
        assert!(matches!(
            InboundMessage::from_delivery(&delivery, AttributeCarrier::Body),
            Err(NormalizeError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_delivery_serializes_body_as_base64() {
        let delivery = RawDelivery::from_outbound(
            &outbound(1, None),
            AttributeCarrier::Properties,
            None,
        );
        let json = serde_json::to_value(&delivery).unwrap();
        assert_eq!(json["body"], "cGF5bG9hZA==");

        let parsed: RawDelivery = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, delivery);
    }
}
