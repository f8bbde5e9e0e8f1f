use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("no clip at index {index} (timeline has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("media file not found: {0}")]
    MediaNotFound(PathBuf),

    #[error("inline media data is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("player error: {0}")]
    Player(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PreviewError>;
