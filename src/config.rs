//! Configuration types.
//!
//! Everything is read from environment variables once, in `main`, and passed
//! down as plain structs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::store::TableNames;
use crate::throttle::ThrottleMode;
use crate::translate::TranslatorConfig;

/// Settings the intake pipeline needs on every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub throttle_mode: ThrottleMode,
    /// Language message bodies are translated into.
    pub target_language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            throttle_mode: ThrottleMode::default(),
            target_language: "en".to_string(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub translator: TranslatorConfig,
    pub log: LogConfig,
    pub api: ApiConfig,
    pub tables: TableNames,
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let msg_table = get("MSG_TABLE").ok_or_else(|| ConfigError::MissingEnvVar("MSG_TABLE".into()))?;
        let throttle_table = get("THROTTLE_TABLE")
            .ok_or_else(|| ConfigError::MissingEnvVar("THROTTLE_TABLE".into()))?;
        let tables = TableNames::new(&msg_table, &throttle_table).map_err(|e| {
            ConfigError::InvalidValue {
                key: "MSG_TABLE/THROTTLE_TABLE".into(),
                message: e.to_string(),
            }
        })?;

        let throttle_mode: ThrottleMode = parse_or(&get, "THROTTLE_MODE", ThrottleMode::default())?;
        let target_language = get("TRANSLATE_TARGET_LANGUAGE").unwrap_or_else(|| "en".to_string());

        let defaults = TranslatorConfig::default();
        let translator = TranslatorConfig {
            base_url: get("TRANSLATE_URL").unwrap_or(defaults.base_url),
            api_key: get("TRANSLATE_API_KEY").map(SecretString::from),
            target_language: target_language.clone(),
            max_retries: parse_or(&get, "TRANSLATE_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(parse_or(
                &get,
                "TRANSLATE_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            max_retry_delay: Duration::from_millis(parse_or(
                &get,
                "TRANSLATE_MAX_RETRY_DELAY_MS",
                defaults.max_retry_delay.as_millis() as u64,
            )?),
            timeout: Duration::from_secs(parse_or(
                &get,
                "TRANSLATE_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
        };

        let log = LogConfig {
            level: parse_or(&get, "LOGLEVEL", LogLevel::default())?,
            format: parse_or(&get, "LOG_FORMAT", LogFormat::default())?,
        };

        let api = ApiConfig {
            port: parse_or(&get, "LORDLASER_API_PORT", ApiConfig::default().port)?,
        };

        let db_path = get("LORDLASER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/lordlaser.db"));

        Ok(Self {
            pipeline: PipelineConfig {
                throttle_mode,
                target_language,
            },
            translator,
            log,
            api,
            tables,
            db_path,
        })
    }
}

/// Parse `key` if set, else use `default`. A set but unparseable value is an error.
fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const TABLES: &[(&str, &str)] = &[
        ("MSG_TABLE", "lordlaser-messages"),
        ("THROTTLE_TABLE", "lordlaser-throttles"),
    ];

    #[test]
    fn defaults_with_only_tables_set() {
        let config = AppConfig::from_lookup(lookup(TABLES)).unwrap();

        assert_eq!(config.tables, TableNames::default());
        assert_eq!(config.pipeline.throttle_mode, ThrottleMode::Cumulative);
        assert_eq!(config.pipeline.target_language, "en");
        assert_eq!(config.translator.base_url, "http://localhost:5000");
        assert!(config.translator.api_key.is_none());
        assert_eq!(config.translator.max_retries, 3);
        assert_eq!(config.translator.retry_delay, Duration::from_millis(200));
        assert_eq!(config.translator.max_retry_delay, Duration::from_secs(5));
        assert_eq!(config.translator.timeout, Duration::from_secs(10));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("./data/lordlaser.db"));
    }

    #[test]
    fn missing_table_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("MSG_TABLE", "m")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "THROTTLE_TABLE"));

        let err = AppConfig::from_lookup(lookup(&[("MSG_TABLE", ""), ("THROTTLE_TABLE", "t")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MSG_TABLE"));
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = TABLES.to_vec();
        pairs.extend([
            ("THROTTLE_MODE", "last-entry"),
            ("TRANSLATE_URL", "http://translate.internal:5000"),
            ("TRANSLATE_API_KEY", "secret"),
            ("TRANSLATE_TARGET_LANGUAGE", "fr"),
            ("TRANSLATE_MAX_RETRIES", "0"),
            ("TRANSLATE_MAX_RETRY_DELAY_MS", "1500"),
            ("LOGLEVEL", "INFO"),
            ("LOG_FORMAT", "pretty"),
            ("LORDLASER_API_PORT", "9090"),
            ("LORDLASER_DB_PATH", "/tmp/ll.db"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.pipeline.throttle_mode, ThrottleMode::LastEntry);
        assert_eq!(config.pipeline.target_language, "fr");
        assert_eq!(config.translator.target_language, "fr");
        assert_eq!(config.translator.base_url, "http://translate.internal:5000");
        assert_eq!(
            config.translator.api_key.as_ref().map(|k| k.expose_secret()),
            Some("secret")
        );
        assert_eq!(config.translator.max_retries, 0);
        assert_eq!(config.translator.max_retry_delay, Duration::from_millis(1500));
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.db_path, PathBuf::from("/tmp/ll.db"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = TABLES.to_vec();
        pairs.push(("LORDLASER_API_PORT", "eighty"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LORDLASER_API_PORT"));

        let err = AppConfig::from_lookup(lookup(&[
            ("MSG_TABLE", "messages; DROP TABLE x"),
            ("THROTTLE_TABLE", "t"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let mut pairs = TABLES.to_vec();
        pairs.push(("THROTTLE_MODE", "random"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }
}
