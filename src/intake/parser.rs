//! Raw notification → `Message` conversion.
//!
//! Fail-fast: the first malformed record rejects the whole batch.

use tracing::debug;

use super::sns::{NotificationRecord, RawSmsPayload};
use crate::error::IntakeError;
use crate::message::Message;

/// An SMS payload with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsPayload {
    pub origination_number: String,
    pub destination_number: String,
    pub message_body: String,
}

impl SmsPayload {
    /// Parse and validate one record's payload.
    ///
    /// Required keys are checked in a fixed order so the error always names
    /// the first one missing.
    pub fn parse(index: usize, raw: &str) -> Result<Self, IntakeError> {
        let payload: RawSmsPayload =
            serde_json::from_str(raw).map_err(|e| IntakeError::InvalidPayload {
                index,
                reason: e.to_string(),
            })?;

        let origination_number = payload
            .origination_number
            .ok_or(IntakeError::MissingOriginationNumber { index })?;
        let destination_number = payload
            .destination_number
            .ok_or(IntakeError::MissingDestinationNumber { index })?;
        let message_body = payload
            .message_body
            .ok_or(IntakeError::MissingMessageBody { index })?;

        Ok(Self {
            origination_number,
            destination_number,
            message_body,
        })
    }
}

/// Convert a batch of raw records into pending SMS messages, one per record,
/// in input order.
pub fn parse_batch(records: &[NotificationRecord]) -> Result<Vec<Message>, IntakeError> {
    let mut messages = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if record.message_id.trim().is_empty() {
            return Err(IntakeError::MissingMessageId { index });
        }
        let payload = SmsPayload::parse(index, &record.payload)?;
        let message = Message::sms(
            record.message_id.clone(),
            payload.origination_number,
            payload.destination_number,
            payload.message_body,
        );
        debug!(
            id = %message.id,
            source = %message.source,
            destination = %message.destination,
            "Parsed inbound SMS"
        );
        messages.push(message);
    }
    Ok(messages)
}
