//! HTTP API over stored messages, the intake pipeline and the blocklist.

pub mod routes;

pub use routes::{ApiState, api_routes};
