//! Integrity check and repair (SPEC_FULL.md §3.5, extending spec.md
//! §4.1's "Fix" operation).
//!
//! `fix` never removes a message: it only straightens bookkeeping
//! (`ActiveMsgs`, `.jdx` alignment, dangling `ReplyTo`/`Reply1st`/
//! `ReplyNext` pointers, and `.jlr` records for users no longer worth
//! tracking). Physical removal of deleted records is `pack`'s job.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use jam_codec::{Decode, Encode};
use jam_types::{IndexRecord, LastReadRecord, MessageHeader, Subfield};

use crate::base::Base;
use crate::error::BaseResult;

/// What a [`Base::fix`] pass found and, if `repair` was requested,
/// corrected.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct FixReport {
    /// `.jdx` records that didn't point at a valid `.jhr` offset.
    pub dangling_index_records: usize,
    /// Header text regions that overran `.jdt`.
    pub dangling_text_regions: usize,
    /// `ActiveMsgs` was wrong and (if `repair`) was recounted.
    pub active_msgs_corrected: bool,
    /// `ReplyTo`/`Reply1st`/`ReplyNext` pointers that referenced a
    /// msgnum no longer present and were (if `repair`) cleared to 0.
    pub dangling_reply_links: usize,
    /// `.jlr` records pruned because their msgnum has no live message.
    pub stale_lastread_records: usize,
    /// `.jdx` size was not a multiple of the index-record size and (if
    /// `repair`) was rebuilt from a scan of `.jhr` (spec.md §8 test 21).
    pub jdx_misaligned: bool,
    /// `ReplyID` subfields with more than one whitespace-separated
    /// token were found and (if `repair`) trimmed to the first token
    /// (spec.md §4.1 "ReplyID cleanup").
    pub malformed_reply_ids: usize,
}

impl FixReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_index_records == 0
            && self.dangling_text_regions == 0
            && !self.active_msgs_corrected
            && self.dangling_reply_links == 0
            && self.stale_lastread_records == 0
            && !self.jdx_misaligned
            && self.malformed_reply_ids == 0
    }
}

/// Trims a `ReplyID` subfield down to its first whitespace-separated
/// token, as some third-party tossers concatenate multiple replies into
/// one subfield (spec.md §4.1 "ReplyID cleanup"). Returns `None` when
/// the value is already a single token.
fn clean_reply_id(data: &[u8]) -> Option<Vec<u8>> {
    let text = String::from_utf8_lossy(data);
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;
    if tokens.next().is_none() {
        return None;
    }
    Some(first.as_bytes().to_vec())
}

fn malformed_reply_id(hdr: &MessageHeader) -> bool {
    match hdr.reply_id() {
        Some(Subfield::ReplyId(data)) => clean_reply_id(data).is_some(),
        _ => false,
    }
}

fn trim_reply_id(mut hdr: MessageHeader) -> MessageHeader {
    if let Some(Subfield::ReplyId(data)) = hdr.reply_id() {
        if let Some(trimmed) = clean_reply_id(data) {
            for sf in hdr.subfields.iter_mut() {
                if let Subfield::ReplyId(data) = sf {
                    *data = trimmed;
                    break;
                }
            }
        }
    }
    hdr
}

impl Base {
    /// Scans the base for integrity problems. When `repair` is true,
    /// corrects what it can in place; otherwise it only reports. Open
    /// the base with [`Base::open_for_fix`] first if `.jdx`/`.jlr` may
    /// be misaligned, since the normal [`Base::open`] refuses that.
    pub fn fix(&self, repair: bool) -> BaseResult<FixReport> {
        let mut report = FixReport::default();
        let paths = self.paths().clone();

        let jdt_len = fs::metadata(paths.jdt())?.len();
        let jhr_len = fs::metadata(paths.jhr())?.len();

        let jdx_len = fs::metadata(paths.jdx())?.len();
        if jdx_len as usize % jam_codec::jam::index::INDEX_RECORD_LEN != 0 {
            report.jdx_misaligned = true;
            if repair {
                self.rebuild_jdx()?;
                report.jdx_misaligned = false;
            } else {
                // Can't trust a misaligned index enough to scan it for
                // the rest of this pass; report what we found and stop.
                log::warn!("fix: .jdx size {jdx_len} not divisible by {}", jam_codec::jam::index::INDEX_RECORD_LEN);
                return Ok(report);
            }
        }

        let jdx_bytes = fs::read(paths.jdx())?;
        let mut index_records = Vec::new();
        let mut rest = jdx_bytes.as_slice();
        while !rest.is_empty() {
            let (tail, rec) = IndexRecord::decode(rest)
                .map_err(|e| crate::error::BaseError::Corrupt(e.to_string()))?;
            index_records.push(rec);
            rest = tail;
        }

        let mut live_msgnums: HashSet<u32> = HashSet::new();
        let mut active_count = 0u32;
        let base_msg_num = self.base_msg_num();

        for (ordinal, rec) in index_records.iter().enumerate() {
            if rec.is_deleted() {
                continue;
            }
            if rec.hdr_offset as u64 >= jhr_len {
                report.dangling_index_records += 1;
                continue;
            }
            let hdr = match self.header_at_offset(rec.hdr_offset) {
                Ok(hdr) => hdr,
                Err(_) => {
                    report.dangling_index_records += 1;
                    continue;
                }
            };
            if hdr.is_deleted() {
                continue;
            }
            let end = hdr.offset as u64 + hdr.txt_len as u64;
            if end > jdt_len {
                report.dangling_text_regions += 1;
                continue;
            }
            live_msgnums.insert(base_msg_num + ordinal as u32);
            active_count += 1;
        }

        if active_count != self.active_msgs() {
            report.active_msgs_corrected = true;
            if repair {
                self.recount_active_msgs(active_count)?;
            }
        }

        if repair {
            report.dangling_reply_links = self.clear_dangling_reply_links(&live_msgnums)?;
        } else {
            report.dangling_reply_links = self.count_dangling_reply_links(&live_msgnums)?;
        }

        let jlr_bytes = fs::read(paths.jlr())?;
        let mut lastread_records = Vec::new();
        let mut rest = jlr_bytes.as_slice();
        while !rest.is_empty() {
            let (tail, rec) = LastReadRecord::decode(rest)
                .map_err(|e| crate::error::BaseError::Corrupt(e.to_string()))?;
            lastread_records.push(rec);
            rest = tail;
        }
        let stale: Vec<usize> = lastread_records
            .iter()
            .enumerate()
            .filter(|(_, rec)| rec.last_read_msg != 0 && !live_msgnums.contains(&rec.last_read_msg))
            .map(|(i, _)| i)
            .collect();
        report.stale_lastread_records = stale.len();
        if repair && !stale.is_empty() {
            let keep: Vec<LastReadRecord> = lastread_records
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !stale.contains(i))
                .map(|(_, rec)| rec)
                .collect();
            self.rewrite_lastread(&keep)?;
        }

        report.malformed_reply_ids = self
            .scan_headers(0, usize::MAX)?
            .iter()
            .filter(|hdr| malformed_reply_id(hdr))
            .count();
        if repair && report.malformed_reply_ids > 0 {
            self.rewrite_with(trim_reply_id)?;
        }

        log::info!("fix (repair={repair}): {report:?}");
        Ok(report)
    }

    /// Rebuilds `.jdx` from a raw scan of `.jhr`, independent of the
    /// index file itself (spec.md §8 test 21). Each header's position
    /// in file order becomes its ordinal, matching the 1:1 correspondence
    /// `post`/`pack` maintain between header order and `msgnum` order.
    fn rebuild_jdx(&self) -> BaseResult<()> {
        let _lock = self.lock_jhr_exclusive()?;
        let headers = self.scan_headers_raw()?;
        let mut buf = Vec::new();
        for (offset, hdr) in &headers {
            let to_crc = hdr
                .subfield_by_lo_id(jam_types::subfield::lo_id::RECEIVER_NAME)
                .map(|sf| jam_codec::crc::crc32_lowercase(&sf.as_str()))
                .unwrap_or(0);
            let mut rec = IndexRecord {
                to_crc,
                hdr_offset: *offset,
            };
            if hdr.is_deleted() {
                rec.mark_deleted();
            }
            rec.encode(&mut buf).expect("index record encode is infallible");
        }

        let new_path = crate::paths::BasePaths::staging(&self.paths().jdx());
        let mut new_jdx = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&new_path)?;
        new_jdx.write_all(&buf)?;
        new_jdx.sync_all()?;
        fs::rename(&new_path, self.paths().jdx())?;

        let active = headers.iter().filter(|(_, hdr)| !hdr.is_deleted()).count() as u32;
        let mut fixed = self.fixed_snapshot();
        if fixed.active_msgs != active {
            fixed.active_msgs = active;
        }
        fixed.mod_counter += 1;
        self.replace_fixed(fixed)?;
        log::warn!("fix: rebuilt .jdx from {} header(s) found in .jhr", headers.len());
        Ok(())
    }

    fn recount_active_msgs(&self, active: u32) -> BaseResult<()> {
        let mut fixed = self.fixed_snapshot();
        fixed.active_msgs = active;
        fixed.mod_counter += 1;
        self.replace_fixed(fixed)
    }

    fn count_dangling_reply_links(&self, live: &HashSet<u32>) -> BaseResult<usize> {
        let mut count = 0;
        for hdr in self.scan_headers(0, usize::MAX)? {
            for link in [hdr.reply_to, hdr.reply_1st, hdr.reply_next] {
                if link != 0 && !live.contains(&link) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn clear_dangling_reply_links(&self, live: &HashSet<u32>) -> BaseResult<usize> {
        let mut count = 0;
        for mut hdr in self.scan_headers(0, usize::MAX)? {
            let msgnum = hdr.msgnum;
            let mut changed = false;
            for link in [&mut hdr.reply_to, &mut hdr.reply_1st, &mut hdr.reply_next] {
                if *link != 0 && !live.contains(link) {
                    *link = 0;
                    changed = true;
                    count += 1;
                }
            }
            if changed {
                self.update_header(msgnum, &hdr)?;
            }
        }
        Ok(count)
    }

    fn rewrite_lastread(&self, records: &[LastReadRecord]) -> BaseResult<()> {
        let mut jlr = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.paths().jlr())?;
        jlr.seek(SeekFrom::Start(0))?;
        for rec in records {
            let mut buf = Vec::new();
            rec.encode(&mut buf)
                .expect("lastread record encode is infallible");
            jlr.write_all(&buf)?;
        }
        jlr.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jam_types::{Attribute, Attribute2, LastReadRecord, Subfield};
    use tempfile::tempdir;

    use crate::base::Base;

    fn header() -> jam_types::MessageHeader {
        jam_types::MessageHeader {
            revision: 1,
            reserved: 0,
            times_read: 0,
            msgid_crc: 0,
            reply_to_msgid_crc: 0,
            password_crc: 0,
            date_written: 1_700_000_000,
            date_received: 0,
            date_processed: 0,
            msgnum: 0,
            attribute: Attribute::LOCAL,
            attribute2: Attribute2::empty(),
            offset: 0,
            txt_len: 0,
            password_crc2: 0,
            cost: 0,
            reply_to: 0,
            reply_1st: 0,
            reply_next: 0,
            subfields: vec![Subfield::Subject(b"hi".to_vec())],
        }
    }

    #[test]
    fn clean_base_reports_clean() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        base.post(header(), b"hello\r").unwrap();
        let report = base.fix(false).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn dangling_reply_link_is_cleared_on_repair() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let msgnum = base.post(header(), b"hello\r").unwrap();
        let mut hdr = base.read_header(msgnum).unwrap();
        hdr.reply_to = 999;
        base.update_header(msgnum, &hdr).unwrap();

        let report = base.fix(false).unwrap();
        assert_eq!(report.dangling_reply_links, 1);

        let report = base.fix(true).unwrap();
        assert_eq!(report.dangling_reply_links, 1);
        let reread = base.read_header(msgnum).unwrap();
        assert_eq!(reread.reply_to, 0);

        let clean = base.fix(false).unwrap();
        assert!(clean.is_clean());
    }

    #[test]
    fn stale_lastread_is_pruned_on_repair() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        base.set_last_read(
            "ghost",
            LastReadRecord {
                user_crc: jam_codec::crc::crc32_lowercase("ghost"),
                user_id: 1,
                last_read_msg: 42,
                high_read_msg: 42,
            },
        )
        .unwrap();

        let report = base.fix(false).unwrap();
        assert_eq!(report.stale_lastread_records, 1);

        base.fix(true).unwrap();
        assert!(base.get_last_read("ghost").is_err());
    }

    #[test]
    fn truncated_jdx_is_reported_then_rebuilt_on_repair() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        base.post(header(), b"hello\r").unwrap();
        base.post(header(), b"world\r").unwrap();

        let jdx_path = base.paths().jdx();
        let mut bytes = std::fs::read(&jdx_path).unwrap();
        bytes.pop();
        std::fs::write(&jdx_path, &bytes).unwrap();

        let base = Base::open_for_fix(dir.path().join("general")).unwrap();
        let report = base.fix(false).unwrap();
        assert!(report.jdx_misaligned);

        let report = base.fix(true).unwrap();
        assert!(!report.jdx_misaligned);
        assert_eq!(base.active_msgs(), 2);
        let headers = base.scan_headers(0, 10).unwrap();
        assert_eq!(headers.len(), 2);

        let clean = base.fix(false).unwrap();
        assert!(clean.is_clean());
    }

    #[test]
    fn malformed_reply_id_is_trimmed_to_first_token_on_repair() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let mut hdr = header();
        hdr.subfields.push(Subfield::ReplyId(b"1:1/1 00000001 1:1/1 00000002".to_vec()));
        let msgnum = base.post(hdr, b"hello\r").unwrap();

        let report = base.fix(false).unwrap();
        assert_eq!(report.malformed_reply_ids, 1);

        base.fix(true).unwrap();
        let reread = base.read_header(msgnum).unwrap();
        assert_eq!(reread.reply_id(), Some(&Subfield::ReplyId(b"1:1/1".to_vec())));

        let clean = base.fix(false).unwrap();
        assert_eq!(clean.malformed_reply_ids, 0);
    }
}
