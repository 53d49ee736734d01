//! FTN Type-2 packet header codec — 58 bytes, little-endian.

use jam_types::ftn::FtnAddress;
use jam_types::PacketHeader;

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};

pub const PACKET_HEADER_LEN: usize = 58;
const WHAT: &str = "FTN packet header";

macro_rules! take_u16 {
    ($rest:expr) => {{
        let (head, tail) = $rest.split_at(2);
        $rest = tail;
        u16::from_le_bytes([head[0], head[1]])
    }};
}

impl<'a> Decode<'a> for PacketHeader {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < PACKET_HEADER_LEN {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: PACKET_HEADER_LEN,
                got: input.len(),
            });
        }
        let (rec, remaining) = input.split_at(PACKET_HEADER_LEN);
        let mut rest = rec;

        let orig_zone = take_u16!(rest);
        let orig_net = take_u16!(rest);
        let orig_node = take_u16!(rest);
        let orig_point = take_u16!(rest);
        let dest_zone = take_u16!(rest);
        let dest_net = take_u16!(rest);
        let dest_node = take_u16!(rest);
        let dest_point = take_u16!(rest);
        let year = take_u16!(rest);
        let month = take_u16!(rest);
        let day = take_u16!(rest);
        let hour = take_u16!(rest);
        let minute = take_u16!(rest);
        let second = take_u16!(rest);
        let baud = take_u16!(rest);
        let packet_type = take_u16!(rest);
        let product_code = take_u16!(rest);
        let (rev, rest2) = rest.split_at(2);
        let revision_major = rev[0];
        let revision_minor = rev[1];
        let mut rest = rest2;
        let (password, rest3) = rest.split_at(8);
        let mut password_arr = [0u8; 8];
        password_arr.copy_from_slice(password);
        rest = rest3;
        let capability_word = take_u16!(rest);

        Ok((
            remaining,
            PacketHeader {
                orig: FtnAddress::new(orig_zone, orig_net, orig_node, orig_point),
                dest: FtnAddress::new(dest_zone, dest_net, dest_node, dest_point),
                year,
                month,
                day,
                hour,
                minute,
                second,
                baud,
                packet_type,
                product_code,
                revision_major,
                revision_minor,
                password: password_arr,
                capability_word,
            },
        ))
    }
}

impl Encode for PacketHeader {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        let start = buf.len();
        buf.extend_from_slice(&self.orig.zone.to_le_bytes());
        buf.extend_from_slice(&self.orig.net.to_le_bytes());
        buf.extend_from_slice(&self.orig.node.to_le_bytes());
        buf.extend_from_slice(&self.orig.point.to_le_bytes());
        buf.extend_from_slice(&self.dest.zone.to_le_bytes());
        buf.extend_from_slice(&self.dest.net.to_le_bytes());
        buf.extend_from_slice(&self.dest.node.to_le_bytes());
        buf.extend_from_slice(&self.dest.point.to_le_bytes());
        buf.extend_from_slice(&self.year.to_le_bytes());
        buf.extend_from_slice(&self.month.to_le_bytes());
        buf.extend_from_slice(&self.day.to_le_bytes());
        buf.extend_from_slice(&self.hour.to_le_bytes());
        buf.extend_from_slice(&self.minute.to_le_bytes());
        buf.extend_from_slice(&self.second.to_le_bytes());
        buf.extend_from_slice(&self.baud.to_le_bytes());
        buf.extend_from_slice(&self.packet_type.to_le_bytes());
        buf.extend_from_slice(&self.product_code.to_le_bytes());
        buf.push(self.revision_major);
        buf.push(self.revision_minor);
        buf.extend_from_slice(&self.password);
        buf.extend_from_slice(&self.capability_word.to_le_bytes());
        buf.resize(start + PACKET_HEADER_LEN, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hdr = PacketHeader::new("1:1/1".parse().unwrap(), "1:1/10".parse().unwrap());
        let mut buf = Vec::new();
        hdr.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), PACKET_HEADER_LEN);
        let (rest, decoded) = PacketHeader::decode(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, hdr);
    }
}
