//! Error taxonomy for the JAM base engine (spec.md §7, the C1 slice).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt base: {0}")]
    Corrupt(String),

    #[error("message {0} not found")]
    NotFound(u32),

    #[error("user {0:?} has no lastread record")]
    NoLastRead(String),

    #[error("base is locked by another process")]
    Locked,

    #[error("update would change subfield-encoded length ({old} -> {new} bytes)")]
    SubfieldLenChanged { old: usize, new: usize },
}

pub type BaseResult<T> = Result<T, BaseError>;
