//! Standard kludge/tearline/origin injection applied to every posted
//! message (spec.md §4.2 "PostMessage").

use jam_codec::crc::crc32;
use jam_types::FtnAddress;

/// Builds the `<addr> <serial>` MSGID for a message originated by
/// `local` right now. The serial has no meaning beyond uniqueness; it
/// is a CRC-32 of the fields that make this post distinct from any
/// other the local node could emit in the same second.
pub fn generate_msgid(local: &FtnAddress, from: &str, subject: &str, date_written: u32) -> String {
    let serial = crc32(format!("{from}\0{subject}\0{date_written}").as_bytes());
    format!("{local} {serial:08x}")
}

/// The tearline appended to an echomail body, identifying the software
/// that produced it.
pub fn tearline() -> String {
    "--- jam-core 0.1".to_string()
}

/// The origin line appended to an echomail body.
pub fn origin_line(origin: &str, local: &FtnAddress) -> String {
    format!("* Origin: {origin} ({local})")
}

/// Converts a display body (`\n` line endings) into JAM's on-disk `\r`
/// convention, appending a tearline and origin line for echomail areas.
pub fn compose_body(body: &str, origin_for_echo: Option<(&str, &FtnAddress)>) -> String {
    let mut lines: Vec<&str> = body.lines().collect();
    // A body with no trailing content still gets its own line once we
    // append the tearline/origin below.
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let mut out = lines.join("\n");
    if let Some((origin, local)) = origin_for_echo {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&tearline());
        out.push('\n');
        out.push_str(&origin_line(origin, local));
    }
    out.replace('\n', "\r") + "\r"
}

/// Converts JAM's `\r`-terminated on-disk body back to `\n` for display.
pub fn display_body(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn msgid_is_stable_for_identical_inputs() {
        let addr = FtnAddress::from_str("1:1/1").unwrap();
        let a = generate_msgid(&addr, "alice", "hi", 1_700_000_000);
        let b = generate_msgid(&addr, "alice", "hi", 1_700_000_000);
        assert_eq!(a, b);
        assert!(a.starts_with("1:1/1 "));
    }

    #[test]
    fn compose_body_converts_newlines_to_cr() {
        let out = compose_body("hello\nworld", None);
        assert_eq!(out, "hello\rworld\r");
    }

    #[test]
    fn compose_body_appends_tearline_and_origin_for_echomail() {
        let addr = FtnAddress::from_str("1:1/1").unwrap();
        let out = compose_body("hello", Some(("A BBS", &addr)));
        assert!(out.contains("--- jam-core 0.1\r"));
        assert!(out.contains("* Origin: A BBS (1:1/1)\r"));
    }

    #[test]
    fn display_body_converts_cr_back_to_newline() {
        assert_eq!(display_body(b"hello\rworld\r"), "hello\nworld\n");
    }
}
