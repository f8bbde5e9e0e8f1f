use std::path::PathBuf;
use storyreel_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("file {name} is too large ({size} bytes). Maximum size is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("file {0} has unsupported type. Allowed types: JPG, PNG, GIF, MP4")]
    UnsupportedMediaType(String),

    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("timeline is empty")]
    EmptyTimeline,

    #[error("total duration {total:.1}s exceeds the {max:.1}s limit")]
    DurationLimitExceeded { total: f64, max: f64 },

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// Validation failures are caught before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RenderError::FileTooLarge { .. }
                | RenderError::UnsupportedMediaType(_)
                | RenderError::InvalidResolution(_)
                | RenderError::EmptyTimeline
                | RenderError::DurationLimitExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
