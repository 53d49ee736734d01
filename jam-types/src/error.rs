//! Validation errors for JAM and FTN data types.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A validation error returned when constructing a misuse-resistant type
/// from an unchecked value (an overlong string, an out-of-range count, ...).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct ValidationError {
    kind: ValidationErrorKind,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "validation failed: {}", self.kind)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ValidationErrorKind {
    #[error("must not be empty")]
    Empty,
    #[error("length {len} exceeds cap of {cap} bytes")]
    TooLong { len: usize, cap: usize },
    #[error("subfield data length {len} does not fit in a u32")]
    SubfieldTooLong { len: usize },
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind) -> Self {
        Self { kind }
    }

    pub fn empty() -> Self {
        Self::new(ValidationErrorKind::Empty)
    }

    pub fn too_long(len: usize, cap: usize) -> Self {
        Self::new(ValidationErrorKind::TooLong { len, cap })
    }

    pub fn subfield_too_long(len: usize) -> Self {
        Self::new(ValidationErrorKind::SubfieldTooLong { len })
    }
}
