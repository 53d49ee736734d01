//! Per-message packet framing: 14-byte header, null-terminated name
//! fields, kludge-line body framing (spec.md §4.4).

use jam_types::ftn::FtnAddress;
use jam_types::{Attribute, RawMessage, Subfield};

use crate::error::DecodeError;

const WHAT: &str = "FTN packet message";
/// Ctrl-A: marks a kludge line.
const KLUDGE_MARKER: u8 = 0x01;
/// JAM/FTN line terminator.
const CR: u8 = 0x0D;

/// `type` field every in-packet message carries.
pub const MESSAGE_TYPE_2: u16 = 0x0002;
/// Sentinel `type` value (`0x0000`) signalling end of packet.
pub const MESSAGE_TYPE_END: u16 = 0x0000;

fn take_cstring<'a>(input: &'a [u8], what: &'static str) -> Result<(&'a [u8], &'a [u8]), DecodeError> {
    match input.iter().position(|&b| b == 0) {
        Some(pos) => Ok((&input[pos + 1..], &input[..pos])),
        None => Err(DecodeError::Unterminated { what }),
    }
}

/// Decode one message from `input`. Returns `Ok(None)` when the next
/// `type` field is the `0x0000` end-of-packet sentinel.
pub fn decode_raw_message(input: &[u8]) -> Result<(&[u8], Option<RawMessage>), DecodeError> {
    if input.len() < 2 {
        return Err(DecodeError::TooShort {
            what: WHAT,
            need: 2,
            got: input.len(),
        });
    }
    let msg_type = u16::from_le_bytes([input[0], input[1]]);
    if msg_type == MESSAGE_TYPE_END {
        return Ok((&input[2..], None));
    }

    const HEADER_LEN: usize = 14;
    if input.len() < HEADER_LEN {
        return Err(DecodeError::TooShort {
            what: WHAT,
            need: HEADER_LEN,
            got: input.len(),
        });
    }
    let orig_node = u16::from_le_bytes([input[2], input[3]]);
    let dest_node = u16::from_le_bytes([input[4], input[5]]);
    let orig_net = u16::from_le_bytes([input[6], input[7]]);
    let dest_net = u16::from_le_bytes([input[8], input[9]]);
    let attribute = u16::from_le_bytes([input[10], input[11]]);
    let cost = u16::from_le_bytes([input[12], input[13]]);
    let rest = &input[HEADER_LEN..];

    let (rest, date) = take_cstring(rest, WHAT)?;
    let (rest, to_user_name) = take_cstring(rest, WHAT)?;
    let (rest, from_user_name) = take_cstring(rest, WHAT)?;
    let (rest, subject) = take_cstring(rest, WHAT)?;

    let body_end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::Unterminated { what: WHAT })?;
    let (body_raw, rest) = (&rest[..body_end], &rest[body_end + 1..]);

    let (area_tag, kludges, body, seen_by, path) = split_body(body_raw);

    Ok((
        rest,
        Some(RawMessage {
            orig: FtnAddress::new(0, orig_net, orig_node, 0),
            dest: FtnAddress::new(0, dest_net, dest_node, 0),
            attribute: Attribute::from_bits_retain(attribute as u32),
            cost,
            date: String::from_utf8_lossy(date).into_owned(),
            to_user_name: String::from_utf8_lossy(to_user_name).into_owned(),
            from_user_name: String::from_utf8_lossy(from_user_name).into_owned(),
            subject: String::from_utf8_lossy(subject).into_owned(),
            area_tag,
            kludges,
            body,
            seen_by,
            path,
        }),
    ))
}

fn split_lines(body: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = body.split(|&b| b == CR).collect();
    if lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

fn kludge_to_subfield(line: &[u8]) -> Subfield {
    // `line` excludes the leading Ctrl-A.
    let text = String::from_utf8_lossy(line);
    let (keyword, value) = match text.split_once(':') {
        Some((k, v)) => (k, v.trim_start()),
        None => (text.as_ref(), ""),
    };
    match keyword.to_ascii_uppercase().as_str() {
        "MSGID" => Subfield::MsgId(value.as_bytes().to_vec()),
        "REPLY" => Subfield::ReplyId(value.as_bytes().to_vec()),
        "PID" => Subfield::Pid(value.as_bytes().to_vec()),
        _ => Subfield::Ftsc(text.as_bytes().to_vec()),
    }
}

fn parse_2d_addresses(value: &str) -> Vec<FtnAddress> {
    value
        .split_whitespace()
        .filter_map(|tok| {
            let (net, node) = tok.split_once('/')?;
            Some(FtnAddress::new(0, net.parse().ok()?, node.parse().ok()?, 0))
        })
        .collect()
}

#[allow(clippy::type_complexity)]
fn split_body(
    body: &[u8],
) -> (
    Option<String>,
    Vec<Subfield>,
    Vec<u8>,
    Vec<FtnAddress>,
    Vec<FtnAddress>,
) {
    let mut lines = split_lines(body);
    let mut area_tag = None;

    if let Some(first) = lines.first() {
        if let Some(rest) = first.strip_prefix(b"AREA:") {
            area_tag = Some(String::from_utf8_lossy(rest).into_owned());
            lines.remove(0);
        }
    }

    let mut kludges = Vec::new();
    while let Some(first) = lines.first() {
        if first.first() == Some(&KLUDGE_MARKER) {
            kludges.push(kludge_to_subfield(&first[1..]));
            lines.remove(0);
        } else {
            break;
        }
    }

    let mut seen_by = Vec::new();
    let mut path = Vec::new();
    while let Some(last) = lines.last() {
        if let Some(rest) = last.strip_prefix(b"SEEN-BY:") {
            seen_by.splice(0..0, parse_2d_addresses(&String::from_utf8_lossy(rest)));
            lines.pop();
        } else if last.first() == Some(&KLUDGE_MARKER)
            && last[1..].starts_with(b"PATH:")
        {
            let value = &last[1 + b"PATH:".len()..];
            path.splice(0..0, parse_2d_addresses(&String::from_utf8_lossy(value)));
            lines.pop();
        } else {
            break;
        }
    }

    let mut visible = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            visible.push(CR);
        }
        visible.extend_from_slice(line);
    }
    if !lines.is_empty() {
        visible.push(CR);
    }

    (area_tag, kludges, visible, seen_by, path)
}

/// Encode one message, appending it (including its `type` field) to `buf`.
pub fn encode_raw_message(msg: &RawMessage, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&MESSAGE_TYPE_2.to_le_bytes());
    buf.extend_from_slice(&msg.orig.node.to_le_bytes());
    buf.extend_from_slice(&msg.dest.node.to_le_bytes());
    buf.extend_from_slice(&msg.orig.net.to_le_bytes());
    buf.extend_from_slice(&msg.dest.net.to_le_bytes());
    buf.extend_from_slice(&(msg.attribute.bits() as u16).to_le_bytes());
    buf.extend_from_slice(&msg.cost.to_le_bytes());
    buf.extend_from_slice(msg.date.as_bytes());
    buf.push(0);
    buf.extend_from_slice(msg.to_user_name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(msg.from_user_name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(msg.subject.as_bytes());
    buf.push(0);

    let mut body = Vec::new();
    if let Some(tag) = &msg.area_tag {
        body.extend_from_slice(b"AREA:");
        body.extend_from_slice(tag.as_bytes());
        body.push(CR);
    }
    for kludge in &msg.kludges {
        body.push(KLUDGE_MARKER);
        encode_kludge_line(kludge, &mut body);
        body.push(CR);
    }
    body.extend_from_slice(&msg.body);
    if !msg.seen_by.is_empty() {
        let mut sorted = msg.seen_by.clone();
        sorted.sort_by_key(|a| a.two_d());
        body.extend_from_slice(b"SEEN-BY:");
        for addr in &sorted {
            body.push(b' ');
            body.extend_from_slice(format!("{}/{}", addr.net, addr.node).as_bytes());
        }
        body.push(CR);
    }
    if !msg.path.is_empty() {
        body.push(KLUDGE_MARKER);
        body.extend_from_slice(b"PATH:");
        for addr in &msg.path {
            body.push(b' ');
            body.extend_from_slice(format!("{}/{}", addr.net, addr.node).as_bytes());
        }
        body.push(CR);
    }

    buf.extend_from_slice(&body);
    buf.push(0);
}

fn encode_kludge_line(sf: &Subfield, out: &mut Vec<u8>) {
    match sf {
        Subfield::MsgId(v) => {
            out.extend_from_slice(b"MSGID: ");
            out.extend_from_slice(v);
        }
        Subfield::ReplyId(v) => {
            out.extend_from_slice(b"REPLY: ");
            out.extend_from_slice(v);
        }
        Subfield::Pid(v) => {
            out.extend_from_slice(b"PID: ");
            out.extend_from_slice(v);
        }
        Subfield::Ftsc(v) => out.extend_from_slice(v),
        other => out.extend_from_slice(other.data()),
    }
}

/// Encode the `0x0000` end-of-packet sentinel.
pub fn encode_end_sentinel(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&MESSAGE_TYPE_END.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawMessage {
        RawMessage {
            orig: FtnAddress::new(0, 1, 1, 0),
            dest: FtnAddress::new(0, 1, 10, 0),
            attribute: Attribute::LOCAL,
            cost: 0,
            date: "27 Jul 26  21:04:11".into(),
            to_user_name: "All".into(),
            from_user_name: "Alice".into(),
            subject: "hi".into(),
            area_tag: Some("GENERAL".into()),
            kludges: vec![Subfield::MsgId(b"1:1/1 1".to_vec())],
            body: b"hello\r".to_vec(),
            seen_by: vec![FtnAddress::new(0, 1, 10, 0), FtnAddress::new(0, 1, 1, 0)],
            path: vec![FtnAddress::new(0, 1, 1, 0)],
        }
    }

    #[test]
    fn round_trips() {
        let msg = sample();
        let mut buf = Vec::new();
        encode_raw_message(&msg, &mut buf);
        let (rest, decoded) = decode_raw_message(&buf).unwrap();
        assert!(rest.is_empty());
        let decoded = decoded.unwrap();
        assert_eq!(decoded.area_tag, msg.area_tag);
        assert_eq!(decoded.kludges, msg.kludges);
        assert_eq!(decoded.body, msg.body);
        // SEEN-BY is sorted ascending on encode; compare as sets.
        let mut expected_seen = msg.seen_by.clone();
        expected_seen.sort_by_key(|a| a.two_d());
        assert_eq!(decoded.seen_by, expected_seen);
        assert_eq!(decoded.path, msg.path);
    }

    #[test]
    fn end_sentinel_is_recognised() {
        let mut buf = Vec::new();
        encode_end_sentinel(&mut buf);
        let (rest, decoded) = decode_raw_message(&buf).unwrap();
        assert!(rest.is_empty());
        assert!(decoded.is_none());
    }

    #[test]
    fn unknown_kludge_round_trips_verbatim() {
        let mut msg = sample();
        msg.kludges.push(Subfield::Ftsc(b"TZUTC: 0000".to_vec()));
        let mut buf = Vec::new();
        encode_raw_message(&msg, &mut buf);
        let (_, decoded) = decode_raw_message(&buf).unwrap();
        let decoded = decoded.unwrap();
        assert!(decoded
            .kludges
            .contains(&Subfield::Ftsc(b"TZUTC: 0000".to_vec())));
    }
}
