//! Blocklist-based throttling of inbound messages.

pub mod blocklist;
pub mod filter;

pub use blocklist::{BlocklistEntry, BlocklistKind, SMS_NUMBER};
pub use filter::{ThrottleMode, apply_entry, throttle_batch};
