//! Error types for Muse.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Muse operations.
#[derive(Error, Debug)]
pub enum MuseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Tool dispatch failed: {0}")]
    ToolDispatch(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Agent exceeded the maximum of {max} model calls in one turn")]
    LoopExceeded { max: usize },

    #[error("Media generation failed: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    Menu(#[from] MenuError),

    #[error("Model error: {0}")]
    Model(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the menu store. These are reported back to the model as
/// descriptive tool results rather than ending a turn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MenuError {
    #[error("Menu item '{0}' already exists")]
    DuplicateItem(String),

    #[error("Menu item '{0}' not found")]
    NotFound(String),

    #[error("Invalid menu item: {0}")]
    InvalidItem(String),

    #[error("No changes given for menu item '{0}'")]
    NoChanges(String),

    #[error("Menu persistence failed: {0}")]
    Persist(String),
}

/// Failures of image and video generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("provider returned no image data")]
    NoImageData,

    #[error("invalid media payload: {0}")]
    InvalidPayload(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("generation job failed: {0}")]
    JobFailed(String),

    #[error("timed out after {0:?} waiting for the video")]
    Timeout(Duration),

    #[error("generation was cancelled")]
    Cancelled,

    #[error("could not store artifact: {0}")]
    Storage(String),
}

/// Result type alias for Muse operations.
pub type Result<T> = std::result::Result<T, MuseError>;
