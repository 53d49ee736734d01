//! `.jhr` variable-length message header records.

use jam_types::header::JAM_SIGNATURE;
use jam_types::{Attribute, Attribute2, MessageHeader};

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};
use crate::jam::subfield::{decode_subfields, encode_subfields};

const WHAT: &str = "JAM message header";

/// Size of the fixed-prefix portion, before the subfield region. Every
/// field in spec.md §3.1's listed order, signature included.
pub const MESSAGE_HEADER_PREFIX_LEN: usize = 4 // signature
    + 2  // revision
    + 4  // reserved
    + 4  // subfield byte count
    + 4  // times read
    + 4  // msgid crc
    + 4  // reply-to msgid crc
    + 4  // password crc
    + 4  // date written
    + 4  // date received
    + 4  // date processed
    + 4  // msgnum
    + 4  // attribute
    + 4  // attribute2
    + 4  // offset
    + 4  // txt len
    + 4  // password crc2
    + 2  // cost
    + 4  // reply to
    + 4  // reply 1st
    + 4; // reply next

macro_rules! take_u32 {
    ($rest:expr) => {{
        if $rest.len() < 4 {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: 4,
                got: $rest.len(),
            });
        }
        let (head, tail) = $rest.split_at(4);
        $rest = tail;
        u32::from_le_bytes([head[0], head[1], head[2], head[3]])
    }};
}

macro_rules! take_u16 {
    ($rest:expr) => {{
        if $rest.len() < 2 {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: 2,
                got: $rest.len(),
            });
        }
        let (head, tail) = $rest.split_at(2);
        $rest = tail;
        u16::from_le_bytes([head[0], head[1]])
    }};
}

impl<'a> Decode<'a> for MessageHeader {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < MESSAGE_HEADER_PREFIX_LEN {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: MESSAGE_HEADER_PREFIX_LEN,
                got: input.len(),
            });
        }
        let (sig, mut rest) = input.split_at(4);
        if sig != JAM_SIGNATURE {
            return Err(DecodeError::BadSignature { what: WHAT });
        }

        let revision = take_u16!(rest);
        let reserved = take_u32!(rest);
        let subfield_byte_count = take_u32!(rest) as usize;
        let times_read = take_u32!(rest);
        let msgid_crc = take_u32!(rest);
        let reply_to_msgid_crc = take_u32!(rest);
        let password_crc = take_u32!(rest);
        let date_written = take_u32!(rest);
        let date_received = take_u32!(rest);
        let date_processed = take_u32!(rest);
        let msgnum = take_u32!(rest);
        let attribute = take_u32!(rest);
        let attribute2 = take_u32!(rest);
        let offset = take_u32!(rest);
        let txt_len = take_u32!(rest);
        let password_crc2 = take_u32!(rest);
        let cost = take_u16!(rest);
        let reply_to = take_u32!(rest);
        let reply_1st = take_u32!(rest);
        let reply_next = take_u32!(rest);

        let subfields = decode_subfields(rest, subfield_byte_count)?;
        let remaining = &rest[subfield_byte_count..];

        Ok((
            remaining,
            MessageHeader {
                revision,
                reserved,
                times_read,
                msgid_crc,
                reply_to_msgid_crc,
                password_crc,
                date_written,
                date_received,
                date_processed,
                msgnum,
                attribute: Attribute::from_bits_retain(attribute),
                attribute2: Attribute2::from_bits_retain(attribute2),
                offset,
                txt_len,
                password_crc2,
                cost,
                reply_to,
                reply_1st,
                reply_next,
                subfields,
            },
        ))
    }
}

impl Encode for MessageHeader {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        let subfield_bytes = encode_subfields(&self.subfields)?;
        if subfield_bytes.len() > u32::MAX as usize {
            return Err(EncodeError::TooLong {
                what: "JAM message header subfield region",
                len: subfield_bytes.len(),
                prefix_bits: 32,
            });
        }

        buf.extend_from_slice(&JAM_SIGNATURE);
        buf.extend_from_slice(&self.revision.to_le_bytes());
        buf.extend_from_slice(&self.reserved.to_le_bytes());
        buf.extend_from_slice(&(subfield_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.times_read.to_le_bytes());
        buf.extend_from_slice(&self.msgid_crc.to_le_bytes());
        buf.extend_from_slice(&self.reply_to_msgid_crc.to_le_bytes());
        buf.extend_from_slice(&self.password_crc.to_le_bytes());
        buf.extend_from_slice(&self.date_written.to_le_bytes());
        buf.extend_from_slice(&self.date_received.to_le_bytes());
        buf.extend_from_slice(&self.date_processed.to_le_bytes());
        buf.extend_from_slice(&self.msgnum.to_le_bytes());
        buf.extend_from_slice(&self.attribute.bits().to_le_bytes());
        buf.extend_from_slice(&self.attribute2.bits().to_le_bytes());
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.txt_len.to_le_bytes());
        buf.extend_from_slice(&self.password_crc2.to_le_bytes());
        buf.extend_from_slice(&self.cost.to_le_bytes());
        buf.extend_from_slice(&self.reply_to.to_le_bytes());
        buf.extend_from_slice(&self.reply_1st.to_le_bytes());
        buf.extend_from_slice(&self.reply_next.to_le_bytes());
        buf.extend_from_slice(&subfield_bytes);
        Ok(())
    }
}

/// Total encoded length of `hdr`: the fixed prefix plus its subfield
/// region. `jam-base` uses this to validate that an in-place
/// `UpdateHeader` call does not change the record's length.
pub fn encoded_len(hdr: &MessageHeader) -> usize {
    let subfield_len: usize = hdr
        .subfields
        .iter()
        .map(|sf| 2 + 2 + 4 + sf.data().len())
        .sum();
    MESSAGE_HEADER_PREFIX_LEN + subfield_len
}
