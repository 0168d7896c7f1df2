//! Error types for dreamcast-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// Narration could not be fetched or decoded; the controller stays
    /// without a buffer and playback is unavailable
    #[error("Media load error: {0}")]
    MediaLoad(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Remote fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// No usable output device (or the platform refused to start one)
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Audio output stream errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Operation attempted on a closed audio context
    #[error("Audio context closed")]
    ContextClosed,

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from dreamcast-common
    #[error(transparent)]
    Common(#[from] dreamcast_common::Error),
}

impl Error {
    /// Wrap any load-path failure as a media load error
    pub fn media_load(err: impl std::fmt::Display) -> Self {
        Error::MediaLoad(err.to_string())
    }
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
