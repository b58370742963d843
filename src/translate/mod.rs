//! Translation: language detection plus translation of message bodies.
//!
//! The enricher calls the translator once per message, in order, and stops at
//! the first failure. Retrying is the translator client's business.

pub mod libre;

pub use libre::{LibreTranslateClient, TranslatorConfig};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{PipelineError, TranslateError};
use crate::message::Message;

/// Result of one detect-and-translate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Detected language of the input text.
    pub source_language: String,
    pub translated_text: String,
}

/// Text-in, text-out translation capability.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language of `text` and translate it into `target_language`.
    async fn detect_and_translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Translation, TranslateError>;
}

/// Attach detected language and translated body to every message.
pub async fn enrich(
    messages: Vec<Message>,
    translator: &dyn Translator,
    target_language: &str,
) -> Result<Vec<Message>, PipelineError> {
    let mut enriched = Vec::with_capacity(messages.len());
    for message in messages {
        let translation = translator
            .detect_and_translate(&message.body, target_language)
            .await
            .map_err(|source| PipelineError::Translation {
                id: message.id.clone(),
                source,
            })?;
        debug!(
            id = %message.id,
            language = %translation.source_language,
            "Detected language"
        );
        enriched.push(message.with_translation(translation.source_language, translation.translated_text));
    }
    info!(count = enriched.len(), target = target_language, "Translated messages");
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Uppercases text and reports a fixed language; fails on a chosen call.
    struct StubTranslator {
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl StubTranslator {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                fail_on_call,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn detect_and_translate(
            &self,
            text: &str,
            target_language: &str,
        ) -> Result<Translation, TranslateError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((text.to_string(), target_language.to_string()));
            if self.fail_on_call == Some(calls.len()) {
                return Err(TranslateError::Unavailable {
                    reason: "stub outage".into(),
                });
            }
            Ok(Translation {
                source_language: "es".into(),
                translated_text: text.to_uppercase(),
            })
        }
    }

    fn batch() -> Vec<Message> {
        vec![
            Message::sms("1", "+1", "+9", "hola"),
            Message::sms("2", "+2", "+9", "adios"),
            Message::sms("3", "+3", "+9", "gracias"),
        ]
    }

    #[tokio::test]
    async fn enriches_every_message_in_order() {
        let translator = StubTranslator::new(None);
        let out = enrich(batch(), &translator, "en").await.unwrap();

        assert_eq!(out.len(), 3);
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(out.iter().all(Message::is_enriched));
        assert_eq!(out[1].language, "es");
        assert_eq!(out[1].translated_body, "ADIOS");
        assert_eq!(out[1].body, "adios");

        let calls = translator.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, target)| target == "en"));
        assert_eq!(calls[2].0, "gracias");
    }

    #[tokio::test]
    async fn first_failure_aborts_enrichment() {
        let translator = StubTranslator::new(Some(2));
        let err = enrich(batch(), &translator, "en").await.unwrap_err();

        match err {
            PipelineError::Translation { id, .. } => assert_eq!(id, "2"),
            other => panic!("Expected Translation error, got {other:?}"),
        }
        // No call is made for the third message.
        assert_eq!(translator.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let translator = StubTranslator::new(Some(1));
        let out = enrich(Vec::new(), &translator, "en").await.unwrap();
        assert!(out.is_empty());
    }
}
