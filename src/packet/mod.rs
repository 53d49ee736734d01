//! FTN Type-2 packet codec (component C4).

pub mod header;
pub mod message;

pub use header::PACKET_HEADER_LEN;
pub use message::{decode_raw_message, encode_raw_message};

use jam_types::{PacketHeader, RawMessage};

use crate::codec::Decode;
use crate::error::DecodeError;

/// Decode a whole packet: header plus every message up to the
/// `0x0000` end sentinel.
pub fn decode_packet(bytes: &[u8]) -> Result<(PacketHeader, Vec<RawMessage>), DecodeError> {
    let (mut rest, header) = PacketHeader::decode(bytes)?;
    let mut messages = Vec::new();
    loop {
        let (remaining, msg) = message::decode_raw_message(rest)?;
        rest = remaining;
        match msg {
            Some(m) => messages.push(m),
            None => break,
        }
    }
    Ok((header, messages))
}

/// Encode a packet header plus messages, terminated with the `0x0000`
/// sentinel.
pub fn encode_packet(header: &PacketHeader, messages: &[RawMessage]) -> Vec<u8> {
    use crate::codec::Encode;
    let mut buf = Vec::new();
    // Header encoding is infallible (fixed-width fields only).
    header.encode(&mut buf).expect("packet header encode is infallible");
    for msg in messages {
        message::encode_raw_message(msg, &mut buf);
    }
    message::encode_end_sentinel(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::ftn::FtnAddress;
    use jam_types::Attribute;

    fn sample_message(tag: &str) -> RawMessage {
        RawMessage {
            orig: FtnAddress::new(0, 1, 1, 0),
            dest: FtnAddress::new(0, 1, 10, 0),
            attribute: Attribute::LOCAL,
            cost: 0,
            date: "27 Jul 26  21:04:11".into(),
            to_user_name: "All".into(),
            from_user_name: "Alice".into(),
            subject: "hi".into(),
            area_tag: Some(tag.into()),
            kludges: vec![jam_types::Subfield::MsgId(b"1:1/1 1".to_vec())],
            body: b"hello\r".to_vec(),
            seen_by: vec![],
            path: vec![],
        }
    }

    #[test]
    fn whole_packet_round_trips() {
        let header = PacketHeader::new("1:1/1".parse().unwrap(), "1:1/10".parse().unwrap());
        let messages = vec![sample_message("UTIL"), sample_message("GENERAL")];
        let bytes = encode_packet(&header, &messages);
        let (decoded_header, decoded_messages) = decode_packet(&bytes).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_messages.len(), 2);
        assert_eq!(decoded_messages[0].area_tag.as_deref(), Some("UTIL"));
        assert_eq!(decoded_messages[1].area_tag.as_deref(), Some("GENERAL"));
    }

    #[test]
    fn empty_packet_decodes_to_no_messages() {
        let header = PacketHeader::new("1:1/1".parse().unwrap(), "1:1/10".parse().unwrap());
        let bytes = encode_packet(&header, &[]);
        let (_, messages) = decode_packet(&bytes).unwrap();
        assert!(messages.is_empty());
    }
}
