//! Error types for channel triage.

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load prompt data from {path}: {reason}")]
    PromptData { path: String, reason: String },
}

/// Messaging transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to fetch {what}: {reason}")]
    FetchFailed { what: String, reason: String },

    #[error("Failed to forward messages from {dialog}: {reason}")]
    ForwardFailed { dialog: String, reason: String },

    #[error("Failed to mark {dialog} as read: {reason}")]
    MarkReadFailed { dialog: String, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Classifier provider errors.
///
/// These never escape `Classifier::classify`; they are logged and turned into
/// "no score".
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Missing credential for provider {provider}")]
    MissingCredential { provider: String },

    #[error("Invalid configuration for provider {provider}: {reason}")]
    InvalidConfig { provider: String, reason: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned a score outside [0, 1]: {raw}")]
    ScoreOutOfRange { provider: String, raw: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
