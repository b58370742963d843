//! Normalized message record shared by intake, throttling, translation and storage.
//!
//! JSON uses the field names the web client already speaks (`ID`, `Type`,
//! `TranslatedBody`, ...), so the same struct backs the REST API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Wire and storage format for `Received`.
pub const RECEIVED_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    #[default]
    Sms,
    Email,
    Web,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Email => "EMAIL",
            Self::Web => "WEB",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMS" => Ok(Self::Sms),
            "EMAIL" => Ok(Self::Email),
            "WEB" => Ok(Self::Web),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation status. Intake always writes `Pending`; the other states are
/// set by moderators through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    #[default]
    Pending,
    Posted,
    Throttled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Posted => "POSTED",
            Self::Throttled => "THROTTLED",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "POSTED" => Ok(Self::Posted),
            "THROTTLED" => Ok(Self::Throttled),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized inbound message.
///
/// `id` is the provider-assigned identity and the only upsert key.
/// `language` and `translated_body` stay empty until enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub r#type: MessageType,
    pub source: String,
    pub destination: String,
    pub body: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub translated_body: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(with = "received_format", default = "received_now")]
    pub received: DateTime<Utc>,
}

impl Message {
    /// A fresh, pending SMS received now.
    pub fn sms(
        id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: MessageType::Sms,
            source: source.into(),
            destination: destination.into(),
            body: body.into(),
            language: String::new(),
            translated_body: String::new(),
            status: MessageStatus::Pending,
            received: received_now(),
        }
    }

    /// Attach the enrichment result.
    pub fn with_translation(
        mut self,
        language: impl Into<String>,
        translated_body: impl Into<String>,
    ) -> Self {
        self.language = language.into();
        self.translated_body = translated_body.into();
        self
    }

    pub fn is_enriched(&self) -> bool {
        !self.language.is_empty() && !self.translated_body.is_empty()
    }

    /// `received` in its canonical `YYYY-MM-DD HH:MM:SSZ` form.
    pub fn received_str(&self) -> String {
        format_received(&self.received)
    }
}

/// Current UTC time truncated to whole seconds, the precision `Received` keeps.
pub fn received_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub fn format_received(dt: &DateTime<Utc>) -> String {
    dt.format(RECEIVED_FORMAT).to_string()
}

pub fn parse_received(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, RECEIVED_FORMAT).map(|ndt| ndt.and_utc())
}

mod received_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_received(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_received(&raw).map_err(serde::de::Error::custom)
    }
}
