//! Error taxonomy for the dupe database (spec.md §7, the C3 slice).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DupeDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt dupe db at {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type DupeDbResult<T> = Result<T, DupeDbError>;
