//! SNS notification wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One raw inbound notification: the provider's message id plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub message_id: String,
    pub payload: String,
}

impl NotificationRecord {
    pub fn new(message_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            payload: payload.into(),
        }
    }
}

/// An SNS event as delivered to a subscriber.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsEventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsEventRecord {
    #[serde(rename = "EventSource", default)]
    pub event_source: Option<String>,
    #[serde(rename = "Sns")]
    pub sns: SnsEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsEntity {
    #[serde(rename = "MessageId", default)]
    pub message_id: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "TopicArn", default)]
    pub topic_arn: Option<String>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

impl From<SnsEvent> for Vec<NotificationRecord> {
    fn from(event: SnsEvent) -> Self {
        event
            .records
            .into_iter()
            .map(|r| NotificationRecord::new(r.sns.message_id, r.sns.message))
            .collect()
    }
}

/// The SMS body carried inside an SNS `Message`.
///
/// Every key is optional at this layer; the parser decides which are required.
/// The payload must be a JSON object whose values are strings or null; a null
/// value counts as absent. Extra keys (`messageKeyword`, `inboundMessageId`,
/// ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "HashMap<String, Option<String>>")]
pub(crate) struct RawSmsPayload {
    pub origination_number: Option<String>,
    pub destination_number: Option<String>,
    pub message_body: Option<String>,
}

impl From<HashMap<String, Option<String>>> for RawSmsPayload {
    fn from(mut fields: HashMap<String, Option<String>>) -> Self {
        let mut take = |key: &str| fields.remove(key).flatten();
        Self {
            origination_number: take("originationNumber"),
            destination_number: take("destinationNumber"),
            message_body: take("messageBody"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sns_event_flattens_into_records() {
        let raw = r#"{
            "Records": [
                {
                    "EventSource": "aws:sns",
                    "Sns": {
                        "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                        "TopicArn": "arn:aws:sns:us-east-1:123456789012:inbound-sms",
                        "Message": "{\"originationNumber\":\"+1555A\"}",
                        "Timestamp": "2024-03-09T17:04:05.000Z"
                    }
                }
            ]
        }"#;
        let event: SnsEvent = serde_json::from_str(raw).unwrap();
        let records: Vec<NotificationRecord> = event.into();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message_id, "95df01b4-ee98-5cb9-9903-4c221d41eb5e");
        assert_eq!(records[0].payload, r#"{"originationNumber":"+1555A"}"#);
    }

    #[test]
    fn empty_event_has_no_records() {
        let event: SnsEvent = serde_json::from_str("{}").unwrap();
        let records: Vec<NotificationRecord> = event.into();
        assert!(records.is_empty());
    }

    #[test]
    fn payload_ignores_unknown_keys() {
        let raw = r#"{"originationNumber":"+1","messageKeyword":"KEYWORD_1","messageBody":"hi"}"#;
        let payload: RawSmsPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.origination_number.as_deref(), Some("+1"));
        assert!(payload.destination_number.is_none());
        assert_eq!(payload.message_body.as_deref(), Some("hi"));
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(serde_json::from_str::<RawSmsPayload>(r#"["+1555A","+1555B","Hola"]"#).is_err());
        assert!(serde_json::from_str::<RawSmsPayload>(r#""+1555A""#).is_err());
    }
}
