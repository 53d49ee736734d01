//! `.jlr` last-read record codec — fixed 16 bytes.

use jam_types::LastReadRecord;

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};

pub const LASTREAD_RECORD_LEN: usize = 16;

impl<'a> Decode<'a> for LastReadRecord {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < LASTREAD_RECORD_LEN {
            return Err(DecodeError::TooShort {
                what: "JAM lastread record",
                need: LASTREAD_RECORD_LEN,
                got: input.len(),
            });
        }
        let (rec, rest) = input.split_at(LASTREAD_RECORD_LEN);
        let user_crc = u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]);
        let user_id = u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]);
        let last_read_msg = u32::from_le_bytes([rec[8], rec[9], rec[10], rec[11]]);
        let high_read_msg = u32::from_le_bytes([rec[12], rec[13], rec[14], rec[15]]);
        Ok((
            rest,
            LastReadRecord {
                user_crc,
                user_id,
                last_read_msg,
                high_read_msg,
            },
        ))
    }
}

impl Encode for LastReadRecord {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.extend_from_slice(&self.user_crc.to_le_bytes());
        buf.extend_from_slice(&self.user_id.to_le_bytes());
        buf.extend_from_slice(&self.last_read_msg.to_le_bytes());
        buf.extend_from_slice(&self.high_read_msg.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let rec = LastReadRecord {
            user_crc: 42,
            user_id: 7,
            last_read_msg: 100,
            high_read_msg: 150,
        };
        let mut buf = Vec::new();
        rec.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), LASTREAD_RECORD_LEN);
        let (rest, decoded) = LastReadRecord::decode(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, rec);
    }
}
