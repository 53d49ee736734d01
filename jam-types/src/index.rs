//! `.jdx` / `.jlr` fixed-size record types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One 8-byte record in `.jdx`. The Nth record corresponds to local
/// message number `BaseMsgNum + N`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexRecord {
    /// CRC-32 of the lowercased recipient name. The high bit is used as
    /// the deleted marker so `fix`/`pack` can recognise a tombstoned
    /// index entry without re-reading the header.
    pub to_crc: u32,
    /// Byte position into `.jhr`.
    pub hdr_offset: u32,
}

/// `.jdx` sets this bit in `ToCRC` to mark the record's header deleted,
/// since a CRC-32 of a name never legitimately needs the top bit (the
/// corresponding header's `Attribute::DELETED` bit remains the source of
/// truth; this is a fast-path cache for pack).
pub const INDEX_DELETED_BIT: u32 = 0x8000_0000;

impl IndexRecord {
    pub fn is_deleted(&self) -> bool {
        self.to_crc & INDEX_DELETED_BIT != 0
    }

    pub fn mark_deleted(&mut self) {
        self.to_crc |= INDEX_DELETED_BIT;
    }

    pub fn to_crc_value(&self) -> u32 {
        self.to_crc & !INDEX_DELETED_BIT
    }
}

/// One 16-byte record in `.jlr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LastReadRecord {
    /// CRC-32 of the lowercased user handle.
    pub user_crc: u32,
    pub user_id: u32,
    pub last_read_msg: u32,
    pub high_read_msg: u32,
}

impl LastReadRecord {
    pub fn new(user_crc: u32, user_id: u32) -> Self {
        Self {
            user_crc,
            user_id,
            last_read_msg: 0,
            high_read_msg: 0,
        }
    }

    pub fn mark_read(&mut self, msgnum: u32) {
        self.last_read_msg = msgnum;
        if msgnum > self.high_read_msg {
            self.high_read_msg = msgnum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_bit_is_separate_from_crc_value() {
        let mut rec = IndexRecord {
            to_crc: 0xDEAD_BEEF & !INDEX_DELETED_BIT,
            hdr_offset: 0,
        };
        assert!(!rec.is_deleted());
        rec.mark_deleted();
        assert!(rec.is_deleted());
        assert_eq!(rec.to_crc_value(), 0xDEAD_BEEF & !INDEX_DELETED_BIT);
    }

    #[test]
    fn mark_read_advances_high_water_mark() {
        let mut rec = LastReadRecord::new(1, 1);
        rec.mark_read(5);
        rec.mark_read(3);
        assert_eq!(rec.last_read_msg, 3);
        assert_eq!(rec.high_read_msg, 5);
    }
}
