//! Fingerprint derivation (spec.md §4.3 "Notes").

use jam_codec::crc::crc32;

/// A message's dedup fingerprint. MSGID-preferred: when present, this
/// is the full `<addr> <serial>` line. Absent an MSGID, a synthetic
/// fingerprint is computed from the envelope fields plus a CRC-32 of
/// the text, so messages lacking kludges still dedup (spec.md §8.14).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_msgid(msgid: &str) -> Self {
        Self(msgid.to_string())
    }

    pub fn synthesize(from: &str, to: &str, subject: &str, date_written: u32, text: &[u8]) -> Self {
        let text_crc = crc32(text);
        Self(format!("{from}\0{to}\0{subject}\0{date_written}\0{text_crc:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msgid_fingerprint_is_used_verbatim() {
        let fp = Fingerprint::from_msgid("1:1/1 deadbeef");
        assert_eq!(fp.as_str(), "1:1/1 deadbeef");
    }

    #[test]
    fn synthetic_fingerprint_is_stable_for_identical_inputs() {
        let a = Fingerprint::synthesize("alice", "bob", "hi", 1_700_000_000, b"hello\r");
        let b = Fingerprint::synthesize("alice", "bob", "hi", 1_700_000_000, b"hello\r");
        assert_eq!(a, b);
    }

    #[test]
    fn synthetic_fingerprint_differs_on_text_change() {
        let a = Fingerprint::synthesize("alice", "bob", "hi", 1_700_000_000, b"hello\r");
        let b = Fingerprint::synthesize("alice", "bob", "hi", 1_700_000_000, b"goodbye\r");
        assert_ne!(a, b);
    }
}
