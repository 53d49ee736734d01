//! `.jdx` index record codec — fixed 8 bytes.

use jam_types::IndexRecord;

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};

pub const INDEX_RECORD_LEN: usize = 8;

impl<'a> Decode<'a> for IndexRecord {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < INDEX_RECORD_LEN {
            return Err(DecodeError::TooShort {
                what: "JAM index record",
                need: INDEX_RECORD_LEN,
                got: input.len(),
            });
        }
        let (rec, rest) = input.split_at(INDEX_RECORD_LEN);
        let to_crc = u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]);
        let hdr_offset = u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]);
        Ok((rest, IndexRecord { to_crc, hdr_offset }))
    }
}

impl Encode for IndexRecord {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(&self.to_crc.to_le_bytes());
        buf.extend_from_slice(&self.hdr_offset.to_le_bytes());
        Ok(())
    }
}
