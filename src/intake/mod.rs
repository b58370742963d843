//! Intake: provider notifications in, normalized messages out.

pub mod parser;
pub mod sns;

pub use parser::{SmsPayload, parse_batch};
pub use sns::{NotificationRecord, SnsEvent};
