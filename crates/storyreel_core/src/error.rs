use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Index {index} out of range (timeline has {len} clips)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unknown clip field: {0}")]
    UnknownField(String),

    #[error("Nothing to import: pasted text is empty")]
    EmptyInput,

    #[error("No valid scenes found in pasted text")]
    NoValidScenes,

    #[error("A drag is already in progress")]
    DragInProgress,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, CoreError>;
