use std::path::PathBuf;

use thiserror::Error;

/// Library error type for vj-frame operations.
///
/// Every variant is recoverable: the display falls back to the last-good
/// transform or the placeholder image instead of terminating.
#[derive(Debug, Error)]
pub enum Error {
    /// The destination quad is degenerate (three corners collinear or the
    /// mapping is otherwise singular). The previous valid transform is kept.
    #[error("degenerate destination quad: {0}")]
    InvalidGeometry(String),

    /// A still image could not be read or decoded.
    #[error("failed to decode {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    /// Video prepare/playback failed, either synchronously or reported
    /// asynchronously by the backend.
    #[error("playback failed for {path}: {reason}")]
    PlaybackFailure { path: PathBuf, reason: String },

    /// The configured media directory is missing or not a directory.
    #[error("invalid media directory: {0}")]
    BadDir(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn playback(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PlaybackFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
