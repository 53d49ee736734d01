//! Bridges a decoded [`RawMessage`] to a dupe-db [`Fingerprint`]
//! (spec.md §4.3 "Notes").

use jam_dupedb::Fingerprint;
use jam_types::{RawMessage, Subfield};

/// MSGID-preferred fingerprint for a decoded packet message. Falls
/// back to a synthetic fingerprint over the envelope fields and a
/// CRC-32 of the text when no MSGID kludge is present (spec.md §8.14).
pub fn fingerprint_of(msg: &RawMessage, date_written: u32) -> Fingerprint {
    if let Some(msgid) = msg.kludges.iter().find_map(|sf| match sf {
        Subfield::MsgId(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }) {
        return Fingerprint::from_msgid(&msgid);
    }
    Fingerprint::synthesize(
        &msg.from_user_name,
        &msg.to_user_name,
        &msg.subject,
        date_written,
        &msg.body,
    )
}
