//! lordlaser — SMS intake, throttling and translation service.

pub mod api;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod store;
pub mod throttle;
pub mod translate;
