//! Top-level error types for Seinfeld.

use crate::Capability;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Load {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Closed set of text-generation failure kinds. Callers switch on this, never
/// on the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend rejected the conversation history as malformed.
    HistoryValidation,
    /// The request never got a response.
    Network,
    /// Rate limit or exhausted quota.
    Quota,
    /// Any other backend-side rejection or failure.
    Backend,
    /// The backend answered but produced no text.
    EmptyResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::HistoryValidation => write!(f, "history_validation"),
            FailureKind::Network => write!(f, "network"),
            FailureKind::Quota => write!(f, "quota"),
            FailureKind::Backend => write!(f, "backend"),
            FailureKind::EmptyResponse => write!(f, "empty_response"),
        }
    }
}

/// Generative backend errors, classified at the call boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("invalid conversation history: {0}")]
    HistoryValidation(String),

    #[error("provider request failed: {0}")]
    Network(String),

    #[error("provider quota exceeded: {0}")]
    Quota(String),

    #[error("provider returned an error: {0}")]
    Backend(String),

    #[error("provider returned no text")]
    EmptyResponse,
}

impl LlmError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LlmError::HistoryValidation(_) => FailureKind::HistoryValidation,
            LlmError::Network(_) => FailureKind::Network,
            LlmError::Quota(_) => FailureKind::Quota,
            LlmError::Backend(_) => FailureKind::Backend,
            LlmError::EmptyResponse => FailureKind::EmptyResponse,
        }
    }
}

/// Image generation failures. Every variant ends in the fallback asset.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image backend returned no images")]
    NoImages,

    #[error("failed to decode generated image: {0}")]
    Decode(String),

    #[error("failed to save generated image to {path}: {source}")]
    Save {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] LlmError),
}

/// Outbound transport failures. Logged; never block other pending sends.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to send message to channel {channel_id}: {reason}")]
    Send { channel_id: String, reason: String },

    #[error("failed to delete messages in channel {channel_id}: {reason}")]
    Delete { channel_id: String, reason: String },

    #[error("failed to fetch history for channel {channel_id}: {reason}")]
    Fetch { channel_id: String, reason: String },

    #[error("invalid channel id: {0}")]
    InvalidChannel(String),
}

/// Command invoked without the required capability.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("missing required capability: {0}")]
    MissingCapability(Capability),
}
