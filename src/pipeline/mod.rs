//! Intake pipeline.
//!
//! Every notification batch flows through:
//! 1. `intake::parse_batch` — raw records to messages, fail-fast
//! 2. `throttle::throttle_batch` — drop blocklisted sources
//! 3. `translate::enrich` — detected language and translated body
//! 4. `MessageStore::put_many` — sequential upserts

pub mod processor;

pub use processor::IntakePipeline;
