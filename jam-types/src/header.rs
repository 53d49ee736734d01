//! Fixed header and message header record types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, Attribute2};
use crate::subfield::Subfield;

/// The 4-byte signature every JAM record family starts with.
pub const JAM_SIGNATURE: [u8; 4] = *b"JAM\0";

/// First record of `.jhr`: the base's fixed header.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedHeader {
    /// UNIX seconds at base creation.
    pub date_created: u32,
    /// Monotonic write counter, bumped on any mutation.
    pub mod_counter: u32,
    /// Count of non-deleted headers.
    pub active_msgs: u32,
    /// CRC-32 of the area password, or 0 if the area has none.
    pub password_crc: u32,
    /// Message number assigned to the first record in this base.
    pub base_msg_num: u32,
}

impl FixedHeader {
    pub fn new(date_created: u32, base_msg_num: u32) -> Self {
        Self {
            date_created,
            mod_counter: 0,
            active_msgs: 0,
            password_crc: 0,
            base_msg_num,
        }
    }
}

/// A variable-length message header record appended to `.jhr`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageHeader {
    pub revision: u16,
    pub reserved: u32,
    pub times_read: u32,
    pub msgid_crc: u32,
    pub reply_to_msgid_crc: u32,
    pub password_crc: u32,
    /// UTC seconds the message was written.
    pub date_written: u32,
    pub date_received: u32,
    pub date_processed: u32,
    pub msgnum: u32,
    pub attribute: Attribute,
    pub attribute2: Attribute2,
    /// Byte offset into `.jdt`.
    pub offset: u32,
    pub txt_len: u32,
    pub password_crc2: u32,
    pub cost: u16,
    pub reply_to: u32,
    pub reply_1st: u32,
    pub reply_next: u32,
    pub subfields: Vec<Subfield>,
}

impl MessageHeader {
    pub fn is_deleted(&self) -> bool {
        self.attribute.contains(Attribute::DELETED)
    }

    pub fn subfield_by_lo_id(&self, lo_id: u16) -> Option<&Subfield> {
        self.subfields.iter().find(|sf| sf.lo_id() == lo_id)
    }

    pub fn msgid(&self) -> Option<&Subfield> {
        self.subfields
            .iter()
            .find(|sf| matches!(sf, Subfield::MsgId(_)))
    }

    pub fn reply_id(&self) -> Option<&Subfield> {
        self.subfields
            .iter()
            .find(|sf| matches!(sf, Subfield::ReplyId(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_attribute_roundtrips_through_contains() {
        let mut hdr = sample_header();
        assert!(!hdr.is_deleted());
        hdr.attribute |= Attribute::DELETED;
        assert!(hdr.is_deleted());
    }

    fn sample_header() -> MessageHeader {
        MessageHeader {
            revision: 1,
            reserved: 0,
            times_read: 0,
            msgid_crc: 0,
            reply_to_msgid_crc: 0,
            password_crc: 0,
            date_written: 0,
            date_received: 0,
            date_processed: 0,
            msgnum: 1,
            attribute: Attribute::LOCAL,
            attribute2: Attribute2::empty(),
            offset: 0,
            txt_len: 0,
            password_crc2: 0,
            cost: 0,
            reply_to: 0,
            reply_1st: 0,
            reply_next: 0,
            subfields: Vec::new(),
        }
    }
}
