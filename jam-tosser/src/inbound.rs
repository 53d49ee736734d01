//! Inbound toss: unpack, dedup, and import (spec.md §4.5 "Inbound toss
//! algorithm").

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};

use jam_codec::packet::decode_packet;
use jam_manager::Manager;
use jam_types::{Attribute, Attribute2, MessageHeader, Subfield};

use crate::area_map::parse as parse_area_map;
use crate::archive::{extract, is_archive};
use crate::error::TosserResult;
use crate::fingerprint::fingerprint_of;

/// Per-message or per-unit failure collected into a [`TossReport`]
/// instead of aborting the run (spec.md §4.5 "Failure semantics").
#[derive(Debug, Clone)]
pub struct TossIssue {
    pub unit: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct TossReport {
    pub packets: usize,
    pub imported: usize,
    pub dupes: usize,
    pub errors: Vec<TossIssue>,
}

/// Where the inbound pipeline looks for work and quarantines failures.
#[derive(Debug, Clone)]
pub struct InboundConfig {
    pub inbound_path: PathBuf,
    pub secure_inbound_path: PathBuf,
    pub bad_path: PathBuf,
    pub bbs_root: PathBuf,
}

/// Enumerates `dirs`, de-duplicating entries so a network whose
/// `secure_inbound` resolves to the same directory as `inbound` (the
/// common case when it is left unconfigured, see `cmd_toss`) does not
/// get every file listed — and processed — twice.
fn candidate_files(dirs: &[&Path]) -> std::io::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                if seen.insert(key) {
                    out.push(path);
                }
            }
        }
    }
    Ok(out)
}

fn is_packet(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("pkt")).unwrap_or(false)
}

/// Runs one inbound toss cycle: extracts archives, decodes every
/// packet found, dedups and imports surviving messages, then persists
/// the dupe DB (pruned).
pub fn process_inbound(
    manager: &Manager,
    dupedb: &jam_dupedb::DupeDb,
    config: &InboundConfig,
    area_map_text: &str,
    network: &str,
) -> TosserResult<TossReport> {
    let area_map = parse_area_map(network, area_map_text, &config.bbs_root)?;
    let mut report = TossReport::default();

    fs::create_dir_all(&config.bad_path)?;
    let run_dir = config.bad_path.join("..").join(format!(".toss-{}", std::process::id()));
    fs::create_dir_all(&run_dir)?;

    let candidates = candidate_files(&[&config.inbound_path, &config.secure_inbound_path])?;
    let mut packet_paths = Vec::new();

    for path in &candidates {
        if is_archive(path) {
            match extract(path, &run_dir) {
                Ok(extracted) => {
                    packet_paths.extend(extracted.into_iter().filter(|p| is_packet(p)));
                    fs::remove_file(path)?;
                }
                Err(e) => {
                    log::error!("{}: archive extraction failed: {e}", path.display());
                    report.errors.push(TossIssue {
                        unit: path.display().to_string(),
                        reason: e.to_string(),
                    });
                    quarantine(path, &config.bad_path)?;
                }
            }
        } else if is_packet(path) {
            packet_paths.push(path.clone());
        }
    }

    for packet_path in packet_paths {
        let bytes = match fs::read(&packet_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        report.packets += 1;
        match decode_packet(&bytes) {
            Ok((_, messages)) => {
                let mut all_ok = true;
                for msg in messages {
                    match import_one(manager, dupedb, &area_map, &msg) {
                        Ok(true) => report.imported += 1,
                        Ok(false) => report.dupes += 1,
                        Err(e) => {
                            all_ok = false;
                            log::error!("{}: {e}", packet_path.display());
                            report.errors.push(TossIssue {
                                unit: packet_path.display().to_string(),
                                reason: e,
                            });
                        }
                    }
                }
                if all_ok {
                    let _ = fs::remove_file(&packet_path);
                } else {
                    let sidecar = packet_path.with_extension("pkt.err");
                    fs::write(sidecar, "one or more messages in this packet failed to import")?;
                }
            }
            Err(e) => {
                log::error!("{}: packet decode failed: {e}", packet_path.display());
                report.errors.push(TossIssue {
                    unit: packet_path.display().to_string(),
                    reason: e.to_string(),
                });
                quarantine(&packet_path, &config.bad_path)?;
            }
        }
    }

    let _ = fs::remove_dir_all(&run_dir);

    dupedb.prune(jam_dupedb::DEFAULT_HORIZON_SECS);
    dupedb.persist()?;

    Ok(report)
}

fn quarantine(path: &Path, bad_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(bad_dir)?;
    if let Some(name) = path.file_name() {
        let _ = fs::rename(path, bad_dir.join(name));
    }
    Ok(())
}

/// Imports one decoded message. Returns `Ok(true)` if it was written
/// to a base, `Ok(false)` if it was suppressed as a dupe.
fn import_one(
    manager: &Manager,
    dupedb: &jam_dupedb::DupeDb,
    area_map: &HashMap<String, (PathBuf, jam_types::AreaMapEntry)>,
    msg: &jam_types::RawMessage,
) -> Result<bool, String> {
    let tag = msg.area_tag.as_deref().ok_or("packet message carries no AREA: line")?;
    if !area_map.contains_key(tag) {
        return Err(format!("area {tag:?} is not subscribed in the area map"));
    }
    if manager.area(tag).is_none() {
        return Err(format!("area {tag:?} is not registered locally"));
    }

    let date_written = parse_ftn_date(&msg.date).timestamp() as u32;
    let fingerprint = fingerprint_of(msg, date_written);
    if dupedb.seen(&fingerprint) {
        return Ok(false);
    }

    let mut subfields = vec![
        Subfield::SenderName(msg.from_user_name.as_bytes().to_vec()),
        Subfield::ReceiverName(msg.to_user_name.as_bytes().to_vec()),
        Subfield::Subject(msg.subject.as_bytes().to_vec()),
    ];
    subfields.extend(msg.kludges.iter().cloned());
    if !msg.seen_by.is_empty() {
        let addrs = msg.seen_by.iter().map(|a| format!("{}/{}", a.net, a.node)).collect::<Vec<_>>().join(" ");
        subfields.push(Subfield::SeenBy(addrs.into_bytes()));
    }
    if !msg.path.is_empty() {
        let addrs = msg.path.iter().map(|a| format!("{}/{}", a.net, a.node)).collect::<Vec<_>>().join(" ");
        subfields.push(Subfield::Path(addrs.into_bytes()));
    }

    let header = MessageHeader {
        revision: 1,
        reserved: 0,
        times_read: 0,
        msgid_crc: 0,
        reply_to_msgid_crc: 0,
        password_crc: 0,
        date_written,
        date_received: 0,
        date_processed: 0,
        msgnum: 0,
        attribute: msg.attribute & !Attribute::RECEIVED,
        attribute2: Attribute2::empty(),
        offset: 0,
        txt_len: 0,
        password_crc2: 0,
        cost: msg.cost,
        reply_to: 0,
        reply_1st: 0,
        reply_next: 0,
        subfields,
    };

    manager
        .import_message(tag, header, &msg.body)
        .map_err(|e| e.to_string())?;
    dupedb.record(fingerprint);
    Ok(true)
}

/// FTN dates look like `"27 Jul 26  21:04:11"`. Malformed dates fall
/// back to the current time rather than failing the whole import.
fn parse_ftn_date(s: &str) -> chrono::DateTime<Utc> {
    for fmt in ["%d %b %y  %H:%M:%S", "%d %b %y %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Utc.from_utc_datetime(&naive);
        }
    }
    Utc::now()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use jam_codec::packet::encode_packet;
    use jam_types::{Area, AreaKind, FtnAddress, PacketHeader, RawMessage};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parses_well_formed_ftn_date() {
        let dt = parse_ftn_date("27 Jul 26  21:04:11");
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2026-07-27");
    }

    #[test]
    fn falls_back_on_malformed_date() {
        let _ = parse_ftn_date("not a date");
    }

    fn echomail(tag: &str, msgid: &str) -> RawMessage {
        RawMessage {
            orig: FtnAddress::new(2, 250, 1, 0),
            dest: FtnAddress::new(2, 250, 2, 0),
            attribute: jam_types::Attribute::empty(),
            cost: 0,
            date: "27 Jul 26  21:04:11".into(),
            to_user_name: "All".into(),
            from_user_name: "Alice".into(),
            subject: "hi".into(),
            area_tag: Some(tag.into()),
            kludges: vec![jam_types::Subfield::MsgId(msgid.as_bytes().to_vec())],
            body: b"hello\r".to_vec(),
            seen_by: vec![],
            path: vec![],
        }
    }

    /// A packet carrying two messages with the same MSGID imports the
    /// first and counts the second as a dupe, with no second header
    /// ever written (spec.md §8 test 19).
    #[test]
    fn second_message_with_duplicate_msgid_is_counted_as_a_dupe() {
        let dir = tempdir().unwrap();
        let bases_dir = dir.path().join("bases");
        let area = Area {
            id: 1,
            tag: "GENERAL".into(),
            name: "General".into(),
            kind: AreaKind::Echo,
            base_path: bases_dir.join("general").to_string_lossy().into_owned(),
            read_acs: String::new(),
            write_acs: String::new(),
            max_messages: None,
            max_age_days: None,
            origin_line: None,
            network_tag: Some("fsxnet".into()),
        };
        let manager = Manager::new(FtnAddress::from_str("2:250/2").unwrap(), vec![area]);
        let dupedb = jam_dupedb::DupeDb::open(dir.path().join("dupedb.json")).unwrap();

        let header = PacketHeader::new(
            FtnAddress::from_str("2:250/1").unwrap(),
            FtnAddress::from_str("2:250/2").unwrap(),
        );
        let messages = vec![
            echomail("GENERAL", "2:250/1 deadbeef"),
            echomail("GENERAL", "2:250/1 deadbeef"),
        ];
        let bytes = encode_packet(&header, &messages);

        let inbound_path = dir.path().join("inbound");
        std::fs::create_dir_all(&inbound_path).unwrap();
        std::fs::write(inbound_path.join("0001.pkt"), bytes).unwrap();

        let config = InboundConfig {
            inbound_path: inbound_path.clone(),
            secure_inbound_path: inbound_path,
            bad_path: dir.path().join("bad"),
            bbs_root: dir.path().to_path_buf(),
        };
        let area_map_text = format!("GENERAL {} 2:250/1\n", bases_dir.join("general").display());

        let report =
            process_inbound(&manager, &dupedb, &config, &area_map_text, "fsxnet").unwrap();

        assert_eq!(report.packets, 1);
        assert_eq!(report.imported, 1);
        assert_eq!(report.dupes, 1);
        assert!(report.errors.is_empty());

        let headers = manager.base_for("GENERAL").unwrap().scan_headers(0, usize::MAX).unwrap();
        assert_eq!(headers.len(), 1);
    }
}
