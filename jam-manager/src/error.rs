//! Error taxonomy for the message manager (spec.md §7, the C2 slice).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown area {0:?}")]
    UnknownArea(String),

    #[error("area {0:?} is read-only for the local node")]
    AreaReadOnly(String),

    #[error("message has no recipient")]
    InvalidRecipient,

    #[error("message body is empty")]
    EmptyBody,

    #[error(transparent)]
    Base(#[from] jam_base::BaseError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
