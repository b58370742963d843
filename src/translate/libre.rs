//! LibreTranslate HTTP client.
//!
//! Speaks the `POST /translate` API with `source: "auto"`, so one call both
//! detects the input language and translates it. Transient failures
//! (HTTP 429, 5xx, transport errors) are retried with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Translation, Translator};
use crate::error::TranslateError;

/// Translation client configuration.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Base URL of a LibreTranslate-compatible server.
    pub base_url: String,
    pub api_key: Option<SecretString>,
    /// Language every message is translated into.
    pub target_language: String,
    /// Retries after the first attempt, for retryable failures only.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub retry_delay: Duration,
    /// Upper bound on any single wait between attempts, `Retry-After` included.
    pub max_retry_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_key: None,
            target_language: "en".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_millis(200),
            max_retry_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    detected_language: Option<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    language: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `Translator` backed by a LibreTranslate server.
pub struct LibreTranslateClient {
    config: TranslatorConfig,
    client: reqwest::Client,
}

impl LibreTranslateClient {
    pub fn new(config: TranslatorConfig) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranslateError::Unavailable {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/translate", self.config.base_url.trim_end_matches('/'))
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`
    /// plus up to half of `base` in jitter, capped at `max_retry_delay`.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_delay;
        let exp = base.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16));
        let jitter_ms = (base.as_millis() / 2) as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        (exp + jitter).min(self.config.max_retry_delay)
    }

    /// Wait before the next attempt. A server `Retry-After` replaces the
    /// computed backoff but is held to the same cap.
    fn retry_delay(&self, error: &TranslateError, attempt: u32) -> Duration {
        match error {
            TranslateError::RateLimited {
                retry_after: Some(after),
            } => (*after).min(self.config.max_retry_delay),
            _ => self.backoff(attempt),
        }
    }

    async fn translate_once(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Translation, TranslateError> {
        let body = TranslateRequest {
            q: text,
            source: "auto",
            target: target_language,
            format: "text",
            api_key: self.config.api_key.as_ref().map(|k| k.expose_secret()),
        };

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Unavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(TranslateError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Unavailable {
                reason: format!("status {status}: {text}"),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(TranslateError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let parsed: TranslateResponse = resp
            .json()
            .await
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        let translated_text = parsed
            .translated_text
            .ok_or_else(|| TranslateError::InvalidResponse("missing translatedText".into()))?;
        let detected = parsed
            .detected_language
            .filter(|d| !d.language.is_empty())
            .ok_or_else(|| TranslateError::InvalidResponse("missing detectedLanguage".into()))?;

        debug!(
            language = %detected.language,
            confidence = detected.confidence,
            "Translation response"
        );

        Ok(Translation {
            source_language: detected.language,
            translated_text,
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn detect_and_translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Translation, TranslateError> {
        let mut attempt = 0;
        loop {
            match self.translate_once(text, target_language).await {
                Ok(translation) => return Ok(translation),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay(&e, attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying translation request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
