//! Outbound scan/export and bundling (spec.md §4.5 "Outbound scan
//! algorithm" and "Pack-outbound algorithm").

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike, Utc};

use jam_base::Base;
use jam_manager::Manager;
use jam_types::{Attribute2, FtnAddress, PacketHeader, RawMessage, Subfield};

use crate::archive::{bundle, bundle_filename};
use crate::error::TosserResult;

/// Packets are capped at this many bytes of message payload before a
/// new packet is started for the same destination (spec.md §6.1 "Packet
/// size").
pub const MAX_PACKET_BYTES: usize = 500 * 1024;

#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub exported: usize,
    pub packets_written: Vec<PathBuf>,
}

/// Scans `area_tag` for non-deleted, not-yet-exported local messages,
/// packetizes them per uplink, marks each exported, and records its
/// MSGID in the dupe DB so a later toss of the same message (e.g. if a
/// downlink echoes it back) does not reimport it (spec.md §4.5 step 6).
pub fn scan_and_export(
    manager: &Manager,
    dupedb: &jam_dupedb::DupeDb,
    area_tag: &str,
    local_address: FtnAddress,
    uplinks: &[FtnAddress],
    outbound_dir: &Path,
) -> TosserResult<ScanReport> {
    let base = manager.base_for(area_tag)?;
    let mut report = ScanReport::default();
    fs::create_dir_all(outbound_dir)?;

    let headers = base.scan_headers(0, usize::MAX)?;
    let mut by_uplink: HashMap<FtnAddress, Vec<RawMessage>> = HashMap::new();
    let mut by_uplink_size: HashMap<FtnAddress, usize> = HashMap::new();
    let mut exported_msgnums = Vec::new();

    for hdr in &headers {
        if hdr.is_deleted() || hdr.attribute2.contains(Attribute2::EXPORTED) {
            continue;
        }
        report.scanned += 1;

        let text = base.read_text(hdr)?;
        let raw = to_raw_message(area_tag, local_address, hdr, text);
        let encoded_len = raw.body.len() + raw.subject.len() + raw.to_user_name.len() + raw.from_user_name.len();

        for uplink in uplinks {
            let entry = by_uplink.entry(*uplink).or_default();
            let size = by_uplink_size.entry(*uplink).or_insert(0);
            if *size + encoded_len > MAX_PACKET_BYTES && !entry.is_empty() {
                flush_packet(local_address, *uplink, entry, outbound_dir, &mut report.packets_written)?;
                *size = 0;
            }
            entry.push(raw.clone());
            *size += encoded_len;
        }

        exported_msgnums.push(hdr.msgnum);
        if let Some(msgid) = raw.kludges.iter().find_map(|sf| match sf {
            Subfield::MsgId(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }) {
            dupedb.record(jam_dupedb::Fingerprint::from_msgid(&msgid));
        }
    }

    for (uplink, messages) in by_uplink {
        if !messages.is_empty() {
            let mut messages = messages;
            flush_packet(local_address, uplink, &mut messages, outbound_dir, &mut report.packets_written)?;
        }
    }

    for msgnum in exported_msgnums {
        let mut hdr = base.read_header(msgnum)?;
        hdr.attribute2 |= Attribute2::EXPORTED;
        base.update_header(msgnum, &hdr)?;
        report.exported += 1;
    }

    dupedb.persist()?;
    Ok(report)
}

fn flush_packet(
    local: FtnAddress,
    uplink: FtnAddress,
    messages: &mut Vec<RawMessage>,
    outbound_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> TosserResult<()> {
    if messages.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let mut header = PacketHeader::new(local, uplink);
    header.year = now.year() as u16;
    header.month = now.month() as u16;
    header.day = now.day() as u16;
    header.hour = now.hour() as u16;
    header.minute = now.minute() as u16;
    header.second = now.second() as u16;

    let bytes = jam_codec::packet::encode_packet(&header, messages);
    let name = format!("{:04x}{:04x}.pkt", uplink.net, uplink.node);
    let path = outbound_dir.join(name);
    fs::write(&path, bytes)?;
    written.push(path);
    messages.clear();
    Ok(())
}

/// Translates a stored [`jam_types::MessageHeader`] back into a
/// [`RawMessage`] ready for packet encoding. `SEEN-BY`/`PATH` kludges
/// already present on the header are carried through untouched; new
/// ones are not invented here, since seen-by propagation belongs to
/// the scan/export policy rather than the codec.
fn to_raw_message(area_tag: &str, local: FtnAddress, hdr: &jam_types::MessageHeader, text: Vec<u8>) -> RawMessage {
    let field = |lo_id| -> String {
        hdr.subfield_by_lo_id(lo_id)
            .map(|sf| sf.as_str().into_owned())
            .unwrap_or_default()
    };
    let mut seen_by = Vec::new();
    let mut path = Vec::new();
    let mut kludges = Vec::new();
    for sf in &hdr.subfields {
        match sf {
            Subfield::SeenBy(bytes) => {
                seen_by.extend(parse_addrs(&String::from_utf8_lossy(bytes)));
            }
            Subfield::Path(bytes) => {
                path.extend(parse_addrs(&String::from_utf8_lossy(bytes)));
            }
            Subfield::MsgId(_) | Subfield::ReplyId(_) | Subfield::Pid(_) | Subfield::Ftsc(_) => {
                kludges.push(sf.clone());
            }
            _ => {}
        }
    }
    if !path.iter().any(|a| *a == local) {
        path.push(local);
    }

    RawMessage {
        orig: local,
        dest: local,
        attribute: hdr.attribute,
        cost: hdr.cost,
        date: chrono::DateTime::<Utc>::from_timestamp(hdr.date_written as i64, 0)
            .map(|dt| dt.format("%d %b %y  %H:%M:%S").to_string())
            .unwrap_or_default(),
        to_user_name: field(jam_types::subfield::lo_id::RECEIVER_NAME),
        from_user_name: field(jam_types::subfield::lo_id::SENDER_NAME),
        subject: field(jam_types::subfield::lo_id::SUBJECT),
        area_tag: Some(area_tag.to_string()),
        kludges,
        body: text,
        seen_by,
        path,
    }
}

fn parse_addrs(value: &str) -> Vec<FtnAddress> {
    value
        .split_whitespace()
        .filter_map(|tok| {
            let (net, node) = tok.split_once('/')?;
            Some(FtnAddress::new(0, net.parse().ok()?, node.parse().ok()?, 0))
        })
        .collect()
}

/// Groups every `.pkt` directly under `outbound_dir` by destination
/// (encoded in its filename by [`flush_packet`]) and bundles each
/// group under the weekday-rotating archive name (spec.md §4.5
/// "Pack-outbound algorithm").
pub fn pack_outbound(outbound_dir: &Path, local_address: FtnAddress) -> TosserResult<Vec<PathBuf>> {
    let mut by_dest: HashMap<String, Vec<PathBuf>> = HashMap::new();
    if outbound_dir.exists() {
        for entry in fs::read_dir(outbound_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("pkt")).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    by_dest.entry(stem.to_string()).or_default().push(path);
                }
            }
        }
    }

    let mut bundles = Vec::new();
    let now = Utc::now();
    for (_, files) in by_dest {
        let bundle_path = outbound_dir.join(bundle_filename(&local_address, now));
        bundle(&bundle_path, &files)?;
        for f in &files {
            fs::remove_file(f)?;
        }
        bundles.push(bundle_path);
    }
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::{Area, AreaKind, MessageDraft, ReceiverName, SenderName, Subject};
    use std::str::FromStr;
    use tempfile::tempdir;

    fn manager_with_area(dir: &Path, tag: &str) -> Manager {
        Manager::new(
            FtnAddress::from_str("1:1/1").unwrap(),
            vec![Area {
                id: 1,
                tag: tag.to_string(),
                name: tag.to_string(),
                kind: AreaKind::Echo,
                base_path: dir.join(tag).to_string_lossy().into_owned(),
                read_acs: String::new(),
                write_acs: String::new(),
                max_messages: None,
                max_age_days: None,
                origin_line: Some("* Origin: test".to_string()),
                network_tag: Some("fidonet".to_string()),
            }],
        )
    }

    #[test]
    fn scan_exports_once_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let manager = manager_with_area(dir.path(), "general");
        manager
            .post_message(
                "general",
                MessageDraft {
                    from: SenderName::from("alice"),
                    to: ReceiverName::from("all"),
                    subject: Subject::from("hi"),
                    body: "hello\n".to_string(),
                    reply_id: None,
                    private: false,
                },
            )
            .unwrap();

        let dupedb = jam_dupedb::DupeDb::open(dir.path().join("dupe.json")).unwrap();
        let uplink = FtnAddress::from_str("1:1/10").unwrap();
        let outbound = dir.path().join("outbound");

        let first = scan_and_export(
            &manager,
            &dupedb,
            "general",
            FtnAddress::from_str("1:1/1").unwrap(),
            &[uplink],
            &outbound,
        )
        .unwrap();
        assert_eq!(first.exported, 1);
        assert_eq!(first.packets_written.len(), 1);

        let second = scan_and_export(
            &manager,
            &dupedb,
            "general",
            FtnAddress::from_str("1:1/1").unwrap(),
            &[uplink],
            &outbound,
        )
        .unwrap();
        assert_eq!(second.exported, 0);
        assert!(second.packets_written.is_empty());
    }

    /// Two echomail posts scanned then bundled end to end: one packet
    /// carrying both messages with an `AREA:` kludge leading each body,
    /// bundled into one weekday-rotating ZIP (spec.md §8 test 20).
    #[test]
    fn scan_then_ftn_pack_bundles_one_packet_with_both_messages() {
        let dir = tempdir().unwrap();
        let manager = manager_with_area(dir.path(), "util");
        for subject in ["first", "second"] {
            manager
                .post_message(
                    "util",
                    MessageDraft {
                        from: SenderName::from("alice"),
                        to: ReceiverName::from("all"),
                        subject: Subject::from(subject),
                        body: format!("{subject}\n"),
                        reply_id: None,
                        private: false,
                    },
                )
                .unwrap();
        }

        let dupedb = jam_dupedb::DupeDb::open(dir.path().join("dupe.json")).unwrap();
        let local = FtnAddress::from_str("1:1/1").unwrap();
        let uplink = FtnAddress::from_str("1:1/10").unwrap();
        let outbound = dir.path().join("outbound");

        let report = scan_and_export(&manager, &dupedb, "util", local, &[uplink], &outbound).unwrap();
        assert_eq!(report.exported, 2);
        assert_eq!(report.packets_written.len(), 1);

        let bytes = fs::read(&report.packets_written[0]).unwrap();
        let (_, messages) = jam_codec::packet::decode_packet(&bytes).unwrap();
        assert_eq!(messages.len(), 2);
        for msg in &messages {
            assert_eq!(msg.area_tag.as_deref(), Some("util"));
        }

        let bundles = pack_outbound(&outbound, local).unwrap();
        assert_eq!(bundles.len(), 1);
        let name = bundles[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("00010001.su"));
        assert!(!report.packets_written[0].exists());
    }

    #[test]
    fn pack_outbound_bundles_pending_packets() {
        let dir = tempdir().unwrap();
        let outbound = dir.path().join("outbound");
        fs::create_dir_all(&outbound).unwrap();
        fs::write(outbound.join("00010002.pkt"), b"packet bytes").unwrap();

        let bundles = pack_outbound(&outbound, FtnAddress::from_str("1:1/1").unwrap()).unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(!outbound.join("00010002.pkt").exists());
    }
}
