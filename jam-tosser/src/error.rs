//! Error taxonomy for the tosser/scanner (spec.md §7, the C5 slice).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TosserError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("packet format error: {0}")]
    Format(#[from] jam_codec::DecodeError),

    #[error(transparent)]
    Manager(#[from] jam_manager::ManagerError),

    #[error(transparent)]
    DupeDb(#[from] jam_dupedb::DupeDbError),

    #[error("{0:?} is not a known area tag")]
    UnknownAreaTag(String),
}

pub type TosserResult<T> = Result<T, TosserError>;
