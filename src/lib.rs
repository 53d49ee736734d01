#![deny(missing_debug_implementations)]

//! Byte-exact codec for the JAM message base on-disk format and FTN
//! Type-2 packets (components C1's wire format and C4).
//!
//! This crate only turns bytes into [`jam_types`] values and back; the
//! file-handling engine that drives reads, appends, and packs against
//! an open base lives in `jam-base`.

pub mod codec;
pub mod crc;
pub mod error;
pub mod jam;
pub mod packet;

pub use codec::{Decode, Encode};
pub use error::{DecodeError, EncodeError};

pub use jam_types;
pub use jam_types as types;
