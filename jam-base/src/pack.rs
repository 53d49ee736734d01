//! Pack: rewrite a base discarding deleted records, renumbering the
//! survivors contiguously while preserving `BaseMsgNum` (spec.md §4.1
//! "Pack").
//!
//! The rewrite is crash-safe: new files are written under `.new`
//! names, fsynced, then the old files are renamed aside to `.bak.<ts>`
//! and the new files renamed into place. A crash between these two
//! renames leaves either the complete old base or the complete new
//! base reachable under the canonical names, never a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use fs2::FileExt;

use jam_codec::{Decode, Encode};
use jam_types::{FixedHeader, IndexRecord};

use crate::base::Base;
use crate::error::{BaseError, BaseResult};
use crate::paths::BasePaths;

impl Base {
    /// Physically removes deleted messages and renumbers the survivors
    /// from `base_msg_num` upward, preserving relative order. Returns
    /// the number of messages removed.
    ///
    /// `.jlr` is left untouched: last-read pointers are msgnum-based,
    /// and a stale pointer past the new high watermark behaves the
    /// same as one pointing at the newest message on any base that has
    /// since had its last message deleted.
    pub fn pack(&self) -> BaseResult<usize> {
        self.rewrite_with(|hdr| hdr)
    }

    /// Full rewrite shared by [`pack`](Self::pack) and the `ReplyID`
    /// cleanup `fix --repair` performs (spec.md §4.1 "ReplyID cleanup"):
    /// every non-deleted header is passed through `transform` before
    /// being re-encoded, which lets a caller shrink a subfield (changing
    /// the record's encoded length, something `update_header` refuses)
    /// by going through the same crash-safe rewrite `pack` already uses.
    pub(crate) fn rewrite_with(
        &self,
        transform: impl Fn(jam_types::MessageHeader) -> jam_types::MessageHeader,
    ) -> BaseResult<usize> {
        let _guard = self.lock_for_pack()?;

        let paths = self.paths().clone();
        let fixed = self.fixed_snapshot();
        let headers = self.scan_headers(0, usize::MAX)?;
        let total_records =
            fs::metadata(paths.jdx())?.len() as usize / jam_codec::jam::index::INDEX_RECORD_LEN;
        let removed = total_records.saturating_sub(headers.len());

        let new_jhr_path = BasePaths::staging(&paths.jhr());
        let new_jdt_path = BasePaths::staging(&paths.jdt());
        let new_jdx_path = BasePaths::staging(&paths.jdx());

        let mut new_jhr = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&new_jhr_path)?;
        let mut new_jdt = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&new_jdt_path)?;
        let mut new_jdx = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&new_jdx_path)?;

        let new_fixed = FixedHeader {
            date_created: fixed.date_created,
            mod_counter: fixed.mod_counter + 1,
            active_msgs: headers.len() as u32,
            password_crc: fixed.password_crc,
            base_msg_num: fixed.base_msg_num,
        };
        let mut fixed_buf = Vec::new();
        new_fixed
            .encode(&mut fixed_buf)
            .expect("fixed header encode is infallible");
        new_jhr.write_all(&fixed_buf)?;

        for (ordinal, hdr) in headers.into_iter().enumerate() {
            let text = self.read_text(&hdr)?;
            let mut hdr = transform(hdr);
            let new_offset = new_jdt.metadata()?.len();
            new_jdt.write_all(&text)?;

            hdr.msgnum = new_fixed.base_msg_num + ordinal as u32;
            hdr.offset = new_offset as u32;

            let to_crc = hdr
                .subfield_by_lo_id(jam_types::subfield::lo_id::RECEIVER_NAME)
                .map(|sf| jam_codec::crc::crc32_lowercase(&sf.as_str()))
                .unwrap_or(0);

            let hdr_offset = new_jhr.metadata()?.len();
            let mut hdr_buf = Vec::new();
            hdr.encode(&mut hdr_buf)
                .map_err(|e| BaseError::Corrupt(e.to_string()))?;
            new_jhr.write_all(&hdr_buf)?;

            let index_rec = IndexRecord {
                to_crc,
                hdr_offset: hdr_offset as u32,
            };
            let mut idx_buf = Vec::new();
            index_rec
                .encode(&mut idx_buf)
                .expect("index record encode is infallible");
            new_jdx.write_all(&idx_buf)?;
        }

        new_jdt.sync_all()?;
        new_jhr.sync_all()?;
        new_jdx.sync_all()?;

        let ts = Utc::now().timestamp();
        for (live, staged) in [
            (paths.jhr(), new_jhr_path),
            (paths.jdt(), new_jdt_path),
            (paths.jdx(), new_jdx_path),
        ] {
            let backup = BasePaths::backup(&live, ts);
            fs::rename(&live, &backup)?;
            fs::rename(&staged, &live)?;
            fs::remove_file(&backup)?;
        }

        self.replace_fixed(new_fixed)?;
        log::info!("packed base: removed {removed} deleted message(s)");
        Ok(removed)
    }

    fn lock_for_pack(&self) -> BaseResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.paths().jhr())?;
        file.try_lock_exclusive().map_err(|_| BaseError::Locked)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use jam_types::{Attribute, Attribute2, Subfield};
    use tempfile::tempdir;

    use crate::base::Base;

    fn header(subject: &str) -> jam_types::MessageHeader {
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
            subfields: vec![Subfield::Subject(subject.as_bytes().to_vec())],
        }
    }

    #[test]
    fn pack_drops_deleted_and_renumbers_contiguously() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let a = base.post(header("one"), b"1\r").unwrap();
        let b = base.post(header("two"), b"2\r").unwrap();
        let c = base.post(header("three"), b"3\r").unwrap();
        base.delete(b).unwrap();

        let removed = base.pack().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(base.active_msgs(), 2);

        let headers = base.scan_headers(0, 10).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].msgnum, a);
        assert_eq!(headers[1].msgnum, c - 1);

        let text_a = base.read_text(&headers[0]).unwrap();
        assert_eq!(text_a, b"1\r");
    }

    #[test]
    fn pack_with_nothing_deleted_is_a_no_op_on_content() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        base.post(header("one"), b"1\r").unwrap();
        base.post(header("two"), b"2\r").unwrap();

        let removed = base.pack().unwrap();
        assert_eq!(removed, 0);
        assert_eq!(base.active_msgs(), 2);
    }
}
