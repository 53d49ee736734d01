//! Message attribute flags (JAM `Attribute`/`Attribute2` words).

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// The JAM `Attribute` bit field (first attribute word).
    ///
    /// `Deleted` is the only legal way to mark a header absent; physical
    /// removal only happens during [`pack`](crate) (the tosser never
    /// removes a record in place).
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Attribute: u32 {
        const LOCAL      = 0x0000_0001;
        const IN_TRANSIT = 0x0000_0002;
        const PRIVATE    = 0x0000_0004;
        const RECEIVED   = 0x0000_0008;
        const SENT       = 0x0000_0010;
        const KILL_SENT  = 0x0000_0020;
        const ARCHIVE_SENT = 0x0000_0040;
        const HOLD       = 0x0000_0080;
        const CRASH      = 0x0000_0100;
        const IMMEDIATE  = 0x0000_0200;
        const DIRECT     = 0x0000_0400;
        const GATE       = 0x0000_0800;
        const FILE_REQUEST = 0x0000_1000;
        const FILE_ATTACHED = 0x0000_2000;
        const TRUNC_FILE = 0x0000_4000;
        const FILE_REQUEST_DENIED = 0x0000_8000;
        const AUDIT_REQUEST = 0x0001_0000;
        const AUDIT_REQUEST_DENIED = 0x0002_0000;
        const NO_DISPLAY = 0x0004_0000;
        const LOCKED     = 0x0008_0000;
        const DELETED    = 0x0010_0000;
    }
}

bitflags! {
    /// The JAM `Attribute2` bit field (second attribute word, vendor area).
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Attribute2: u32 {
        const EXPORTED = 0x0000_0001;
    }
}

impl Default for Attribute {
    fn default() -> Self {
        Attribute::empty()
    }
}
