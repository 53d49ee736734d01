//! Decode/encode errors for JAM records and FTN packets.

use thiserror::Error;

/// Mirrors the `ErrFormat`/`ErrCorrupt` members of the core's error
/// taxonomy at the byte level.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    /// Fewer bytes were supplied than the record's fixed prefix needs.
    #[error("{what}: need at least {need} bytes, got {got}")]
    TooShort {
        what: &'static str,
        need: usize,
        got: usize,
    },
    /// A fixed signature/tag did not match what was expected.
    #[error("{what}: bad signature")]
    BadSignature { what: &'static str },
    /// A length-prefixed field claims more bytes than are available.
    #[error("{what}: length field claims {claimed} bytes, only {available} available")]
    LengthOverrun {
        what: &'static str,
        claimed: usize,
        available: usize,
    },
    /// A null-terminated string field never hit its terminator.
    #[error("{what}: unterminated string")]
    Unterminated { what: &'static str },
    /// Bytes were not valid for the field (e.g. non-UTF8 where required).
    #[error("{what}: {detail}")]
    Invalid { what: &'static str, detail: String },
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EncodeError {
    /// A variable-length field exceeds what its length prefix can hold.
    #[error("{what}: length {len} does not fit in {prefix_bits} bits")]
    TooLong {
        what: &'static str,
        len: usize,
        prefix_bits: u32,
    },
}
