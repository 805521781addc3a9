use thiserror::Error;

/// Library-level errors using thiserror for structured error handling.
///
/// These errors represent domain-specific failures that can occur while
/// managing playback sessions. They provide context and can be chained
/// with anyhow.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to resolve audio source: {reference}")]
    ResolutionFailed { reference: String, reason: String },

    #[error("Failed to open audio source: {path}")]
    OpenFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid fade specification: {0}")]
    InvalidFadeSpec(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
