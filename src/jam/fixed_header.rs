//! `.jhr` fixed header (first record of the file).

use nom::number::complete::le_u32;
use jam_types::header::JAM_SIGNATURE;
use jam_types::FixedHeader;

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};

/// On-disk size of the fixed header record, padding included. Matches
/// the published JAM layout: four-byte signature, five `u32` fields,
/// the rest reserved for forward compatibility.
pub const FIXED_HEADER_LEN: usize = 1024;

const WHAT: &str = "JAM fixed header";

impl<'a> Decode<'a> for FixedHeader {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < FIXED_HEADER_LEN {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: FIXED_HEADER_LEN,
                got: input.len(),
            });
        }
        let (rest, sig) = nom::bytes::complete::take(4usize)(input)
            .map_err(|_: nom::Err<()>| DecodeError::TooShort {
                what: WHAT,
                need: 4,
                got: input.len(),
            })?;
        if sig != JAM_SIGNATURE {
            return Err(DecodeError::BadSignature { what: WHAT });
        }
        let (rest, date_created) = le_u32::<_, ()>(rest).map_err(|_| DecodeError::TooShort {
            what: WHAT,
            need: 4,
            got: rest.len(),
        })?;
        let (rest, mod_counter) = le_u32::<_, ()>(rest).map_err(|_| DecodeError::TooShort {
            what: WHAT,
            need: 4,
            got: rest.len(),
        })?;
        let (rest, active_msgs) = le_u32::<_, ()>(rest).map_err(|_| DecodeError::TooShort {
            what: WHAT,
            need: 4,
            got: rest.len(),
        })?;
        let (rest, password_crc) = le_u32::<_, ()>(rest).map_err(|_| DecodeError::TooShort {
            what: WHAT,
            need: 4,
            got: rest.len(),
        })?;
        let (_reserved, base_msg_num) = le_u32::<_, ()>(rest).map_err(|_| DecodeError::TooShort {
            what: WHAT,
            need: 4,
            got: rest.len(),
        })?;

        // Remainder of the 1024-byte record is reserved padding; skip it.
        let remaining = &input[FIXED_HEADER_LEN..];

        Ok((
            remaining,
            FixedHeader {
                date_created,
                mod_counter,
                active_msgs,
                password_crc,
                base_msg_num,
            },
        ))
    }
}

impl Encode for FixedHeader {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        let start = buf.len();
        buf.extend_from_slice(&JAM_SIGNATURE);
        buf.extend_from_slice(&self.date_created.to_le_bytes());
        buf.extend_from_slice(&self.mod_counter.to_le_bytes());
        buf.extend_from_slice(&self.active_msgs.to_le_bytes());
        buf.extend_from_slice(&self.password_crc.to_le_bytes());
        buf.extend_from_slice(&self.base_msg_num.to_le_bytes());
        let written = buf.len() - start;
        buf.resize(start + FIXED_HEADER_LEN, 0);
        debug_assert!(written <= FIXED_HEADER_LEN);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hdr = FixedHeader {
            date_created: 1_700_000_000,
            mod_counter: 7,
            active_msgs: 3,
            password_crc: 0,
            base_msg_num: 1,
        };
        let mut buf = Vec::new();
        hdr.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), FIXED_HEADER_LEN);
        let (rest, decoded) = FixedHeader::decode(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, hdr);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = vec![0u8; FIXED_HEADER_LEN];
        buf[0..4].copy_from_slice(b"NOPE");
        assert_eq!(
            FixedHeader::decode(&buf),
            Err(DecodeError::BadSignature { what: WHAT })
        );
    }

    #[test]
    fn rejects_short_input() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            FixedHeader::decode(&buf),
            Err(DecodeError::TooShort { .. })
        ));
    }
}
