//! Blocklist entries as read from the blocklist store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Category tag for entries that block by SMS source number.
pub const SMS_NUMBER: &str = "smsnumber";

/// One blocklist category and the values it blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlocklistEntry {
    /// Free-form category tag, e.g. `smsnumber`.
    pub r#type: String,
    #[serde(default)]
    pub values: BTreeSet<String>,
}

/// How the filter treats an entry's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlocklistKind {
    SmsNumber,
    Unrecognized,
}

impl BlocklistEntry {
    pub fn new<I, S>(r#type: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            r#type: r#type.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Shorthand for an `smsnumber` entry.
    pub fn sms_numbers<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SMS_NUMBER, values)
    }

    pub fn kind(&self) -> BlocklistKind {
        match self.r#type.as_str() {
            SMS_NUMBER => BlocklistKind::SmsNumber,
            _ => BlocklistKind::Unrecognized,
        }
    }

    pub fn blocks(&self, value: &str) -> bool {
        self.values.contains(value)
    }
}
