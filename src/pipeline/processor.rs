//! Intake pipeline: parse, throttle, translate, persist.
//!
//! One run handles one batch to completion, awaiting each stage in order.
//! The first stage error aborts the run.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::intake::{NotificationRecord, parse_batch};
use crate::store::{BlocklistStore, MessageStore};
use crate::throttle::throttle_batch;
use crate::translate::{Translator, enrich};

/// Composes intake, throttling, translation and persistence.
pub struct IntakePipeline {
    config: PipelineConfig,
    blocklist: Arc<dyn BlocklistStore>,
    messages: Arc<dyn MessageStore>,
    translator: Arc<dyn Translator>,
}

impl IntakePipeline {
    pub fn new(
        config: PipelineConfig,
        blocklist: Arc<dyn BlocklistStore>,
        messages: Arc<dyn MessageStore>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config,
            blocklist,
            messages,
            translator,
        }
    }

    /// Run one batch. Returns the number of messages written.
    ///
    /// On a persistence failure the error carries the number written before it.
    pub async fn run(&self, records: &[NotificationRecord]) -> Result<usize, PipelineError> {
        info!(records = records.len(), "Processing notification batch");

        let result = self.run_stages(records).await;
        match &result {
            Ok(written) => info!(written, "Batch complete"),
            Err(e) => error!(
                kind = ?e.kind(),
                written = e.written(),
                error = %e,
                "Batch failed"
            ),
        }
        result
    }

    async fn run_stages(&self, records: &[NotificationRecord]) -> Result<usize, PipelineError> {
        let parsed = parse_batch(records)?;

        // Re-read on every run; the blocklist is never cached.
        let entries = self
            .blocklist
            .list_entries()
            .await
            .map_err(PipelineError::BlocklistUnavailable)?;
        let allowed = throttle_batch(parsed, &entries, self.config.throttle_mode);

        let enriched = enrich(
            allowed,
            self.translator.as_ref(),
            &self.config.target_language,
        )
        .await?;

        Ok(self.messages.put_many(&enriched).await?)
    }
}
