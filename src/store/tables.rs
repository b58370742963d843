//! Validated table names.
//!
//! Table names come from configuration and are interpolated into SQL, so they
//! are restricted to `[A-Za-z0-9_-]{1,64}` and always emitted double-quoted.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DatabaseError;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("table name regex is valid"));

/// A table name that is safe to quote into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = name.into();
        if TABLE_NAME.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(DatabaseError::InvalidTableName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two tables the service reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub messages: TableName,
    pub blocklist: TableName,
}

impl TableNames {
    pub fn new(messages: &str, blocklist: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            messages: TableName::new(messages)?,
            blocklist: TableName::new(blocklist)?,
        })
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            messages: TableName("lordlaser-messages".to_string()),
            blocklist: TableName("lordlaser-throttles".to_string()),
        }
    }
}
