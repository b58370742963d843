//! Source-number throttling.
//!
//! `apply_entry` filters one batch against one entry. `throttle_batch` folds a
//! whole blocklist over a batch according to a [`ThrottleMode`].

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::blocklist::{BlocklistEntry, BlocklistKind};
use crate::message::Message;

/// How several recognized entries combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleMode {
    /// Each entry filters the survivors of the previous one.
    #[default]
    Cumulative,
    /// Each entry filters the original batch; the last entry's result wins.
    LastEntry,
}

impl ThrottleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cumulative => "cumulative",
            Self::LastEntry => "last-entry",
        }
    }
}

impl FromStr for ThrottleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cumulative" => Ok(Self::Cumulative),
            "last-entry" | "last_entry" => Ok(Self::LastEntry),
            other => Err(format!(
                "expected \"cumulative\" or \"last-entry\", got {other:?}"
            )),
        }
    }
}

impl fmt::Display for ThrottleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drop every message whose source is listed in `entry`.
///
/// Entries of an unrecognized category pass the batch through untouched;
/// [`throttle_batch`] reports them.
pub fn apply_entry(messages: &[Message], entry: &BlocklistEntry) -> Vec<Message> {
    if entry.kind() == BlocklistKind::Unrecognized {
        return messages.to_vec();
    }

    debug!(count = messages.len(), "Processing SMS throttle");
    messages
        .iter()
        .filter(|msg| {
            if entry.blocks(&msg.source) {
                warn!(source = %msg.source, id = %msg.id, "Throttling message from source number");
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}

/// Apply every recognized entry in `entries` to `messages`.
///
/// With no recognized entries the batch is returned unchanged.
pub fn throttle_batch(
    messages: Vec<Message>,
    entries: &[BlocklistEntry],
    mode: ThrottleMode,
) -> Vec<Message> {
    for entry in entries {
        if entry.kind() == BlocklistKind::Unrecognized {
            warn!(throttle_type = %entry.r#type, "Unknown throttle type, skipping");
        } else {
            debug!(
                throttle_type = %entry.r#type,
                values = entry.values.len(),
                "Loaded throttle"
            );
        }
    }

    let recognized = entries
        .iter()
        .filter(|e| e.kind() == BlocklistKind::SmsNumber);

    let input = messages.len();
    let survivors = match mode {
        ThrottleMode::Cumulative => {
            recognized.fold(messages, |batch, entry| apply_entry(&batch, entry))
        }
        ThrottleMode::LastEntry => {
            let mut last = None;
            for entry in recognized {
                last = Some(apply_entry(&messages, entry));
            }
            last.unwrap_or(messages)
        }
    };

    info!(
        mode = %mode,
        input,
        passed = survivors.len(),
        "Throttling complete"
    );
    survivors
}
