//! Error types for lordlaser.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// A `put_many` that stopped at its first failed write.
///
/// Writes before the failure are durable; nothing is rolled back.
#[derive(Debug, thiserror::Error)]
#[error("wrote {written} message(s) before failure: {source}")]
pub struct PartialWrite {
    pub written: usize,
    #[source]
    pub source: DatabaseError,
}

/// Errors turning raw notification records into messages.
///
/// `index` is the position of the offending record in its batch.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("record {index}: notification has no message id")]
    MissingMessageId { index: usize },

    #[error("record {index}: payload is not a JSON object of strings: {reason}")]
    InvalidPayload { index: usize, reason: String },

    #[error("record {index}: originationNumber not found")]
    MissingOriginationNumber { index: usize },

    #[error("record {index}: destinationNumber not found")]
    MissingDestinationNumber { index: usize },

    #[error("record {index}: messageBody not found")]
    MissingMessageBody { index: usize },
}

/// Translation service errors.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Translation service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Translation service rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Translation rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Invalid response from translation service: {0}")]
    InvalidResponse(String),
}

impl TranslateError {
    /// Whether the client may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::RateLimited { .. })
    }
}

/// Coarse classification callers use to decide between retrying,
/// dead-lettering and reporting a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    UpstreamUnavailable,
    NotFound,
}

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] IntakeError),

    #[error("Blocklist store unavailable: {0}")]
    BlocklistUnavailable(#[source] DatabaseError),

    #[error("Translation failed for message {id}: {source}")]
    Translation {
        id: String,
        #[source]
        source: TranslateError,
    },

    #[error("Persistence failed after {written} write(s): {source}")]
    Persistence {
        written: usize,
        #[source]
        source: DatabaseError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::BlocklistUnavailable(_) | Self::Translation { .. } | Self::Persistence { .. } => {
                ErrorKind::UpstreamUnavailable
            }
        }
    }

    /// Messages durably written before the run failed.
    pub fn written(&self) -> usize {
        match self {
            Self::Persistence { written, .. } => *written,
            _ => 0,
        }
    }
}

impl From<PartialWrite> for PipelineError {
    fn from(e: PartialWrite) -> Self {
        Self::Persistence {
            written: e.written,
            source: e.source,
        }
    }
}

/// Result type alias for lordlaser.
pub type Result<T> = std::result::Result<T, Error>;
