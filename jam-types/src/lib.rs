#![deny(missing_debug_implementations)]

//! Misuse-resistant data structures for the JAM message base format and
//! the FTN Type-2 packet format it is bridged to. This crate carries no
//! I/O; see `jam-codec` for encode/decode and `jam-base` for the engine
//! that drives reads and writes against a base on disk.

pub mod area;
pub mod attribute;
pub mod core;
pub mod error;
pub mod ftn;
pub mod header;
pub mod index;
pub mod message;
pub mod subfield;

pub use area::{Area, AreaKind, AreaMapEntry};
pub use attribute::{Attribute, Attribute2};
pub use core::{ReceiverName, SenderName, Subject};
pub use error::ValidationError;
pub use ftn::{FtnAddress, PacketHeader, RawMessage};
pub use header::{FixedHeader, MessageHeader, JAM_SIGNATURE};
pub use index::{IndexRecord, LastReadRecord};
pub use message::{Message, MessageDraft};
pub use subfield::Subfield;
