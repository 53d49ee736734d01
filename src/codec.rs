//! `Decode`/`Encode` traits shared by every record family in this crate.

use crate::error::{DecodeError, EncodeError};

/// Decode a `Self` from the front of `input`, returning the remaining
/// bytes alongside the parsed value — the same shape `nom` combinators
/// use internally, so callers can chain decodes record-by-record.
pub trait Decode<'a>: Sized {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError>;
}

/// Encode `self` by appending bytes to `buf`.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError>;
}
