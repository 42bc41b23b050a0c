//! Error types for longscribe.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LongscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Failed to serialize configuration: {message}")]
    ConfigSerialize { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Planning errors (fatal to a session)
    #[error("Planning failed: {message}")]
    Planning { message: String },

    // Segment producer errors
    #[error("Segment producer tool not found: {tool}")]
    ProducerToolNotFound { tool: String },

    #[error("Segment extraction failed: {message}")]
    Producer { message: String },

    // Transcription engine errors
    #[error("Transcription engine not found: {program}")]
    EngineToolNotFound { program: String },

    #[error("Transcription engine failed: {message}")]
    Engine { message: String },

    #[error("Transcription attempt exceeded {limit:?}")]
    Timeout { limit: Duration },

    // Session errors
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Coordinator fault: {message}")]
    Coordinator { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LongscribeError>;
