//! The JAM base engine: open/post/read/update/delete against the four
//! on-disk files (spec.md §4.1).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use chrono::Utc;
use fs2::FileExt;

use jam_codec::jam::fixed_header::FIXED_HEADER_LEN;
use jam_codec::jam::index::INDEX_RECORD_LEN;
use jam_codec::jam::lastread::LASTREAD_RECORD_LEN;
use jam_codec::jam::message_header::encoded_len;
use jam_codec::{Decode, Encode};
use jam_types::{FixedHeader, IndexRecord, LastReadRecord, MessageHeader};

use jam_codec::crc::crc32_lowercase;
use crate::error::{BaseError, BaseResult};
use crate::paths::BasePaths;

/// An open JAM base. Cheaply cloneable-by-reference: wrap in `Arc` to
/// share one base across multiple call sites in the same process.
#[derive(Debug)]
pub struct Base {
    paths: BasePaths,
    /// Protects the cached fixed header and serialises writers within
    /// this process. Readers only hold it long enough to snapshot the
    /// header and compute a seek offset (spec.md §5).
    state: Mutex<FixedHeader>,
}

impl Base {
    /// Create a brand-new base at `prefix`. Fails if any of the four
    /// files already exist.
    pub fn create(prefix: impl Into<std::path::PathBuf>, base_msg_num: u32) -> BaseResult<Self> {
        let paths = BasePaths::new(prefix);
        for path in [paths.jhr(), paths.jdt(), paths.jdx(), paths.jlr()] {
            if path.exists() {
                return Err(BaseError::Corrupt(format!(
                    "{} already exists",
                    path.display()
                )));
            }
        }
        let fixed = FixedHeader::new(Utc::now().timestamp() as u32, base_msg_num);
        let mut jhr = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(paths.jhr())?;
        let mut buf = Vec::new();
        fixed
            .encode(&mut buf)
            .expect("fixed header encode is infallible");
        jhr.write_all(&buf)?;
        jhr.sync_all()?;
        File::create(paths.jdt())?.sync_all()?;
        File::create(paths.jdx())?.sync_all()?;
        File::create(paths.jlr())?.sync_all()?;

        Ok(Self {
            paths,
            state: Mutex::new(fixed),
        })
    }

    /// Open an existing base, validating the fixed header and the size
    /// alignment of `.jdx`/`.jlr`.
    pub fn open(prefix: impl Into<std::path::PathBuf>) -> BaseResult<Self> {
        Self::open_impl(prefix, false)
    }

    /// Open a base for [`fix`](Self::fix) without rejecting a
    /// misaligned `.jdx`/`.jlr` up front (spec.md §8 test 21): `fix`
    /// itself is the only caller allowed to see and repair that state.
    pub fn open_for_fix(prefix: impl Into<std::path::PathBuf>) -> BaseResult<Self> {
        Self::open_impl(prefix, true)
    }

    fn open_impl(prefix: impl Into<std::path::PathBuf>, tolerant: bool) -> BaseResult<Self> {
        let paths = BasePaths::new(prefix);
        let mut jhr = File::open(paths.jhr())?;
        let mut buf = vec![0u8; FIXED_HEADER_LEN];
        jhr.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                BaseError::Corrupt(format!("{}: file shorter than fixed header", paths.jhr().display()))
            } else {
                BaseError::Io(e)
            }
        })?;
        let (_, fixed) = FixedHeader::decode(&buf).map_err(|e| {
            BaseError::Corrupt(format!("{}: {e}", paths.jhr().display()))
        })?;

        if !tolerant {
            let jdx_len = paths.jdx().metadata()?.len() as usize;
            if jdx_len % INDEX_RECORD_LEN != 0 {
                return Err(BaseError::Corrupt(format!(
                    ".jdx size {jdx_len} not divisible by {INDEX_RECORD_LEN}"
                )));
            }
            let jlr_len = paths.jlr().metadata()?.len() as usize;
            if jlr_len % LASTREAD_RECORD_LEN != 0 {
                return Err(BaseError::Corrupt(format!(
                    ".jlr size {jlr_len} not divisible by {LASTREAD_RECORD_LEN}"
                )));
            }
        }

        Ok(Self {
            paths,
            state: Mutex::new(fixed),
        })
    }

    pub fn close(self) {
        // Files are closed on drop; nothing else to release.
    }

    pub fn base_msg_num(&self) -> u32 {
        self.state.lock().unwrap().base_msg_num
    }

    pub fn active_msgs(&self) -> u32 {
        self.state.lock().unwrap().active_msgs
    }

    pub fn mod_counter(&self) -> u32 {
        self.state.lock().unwrap().mod_counter
    }

    pub(crate) fn lock_jhr_exclusive(&self) -> BaseResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.paths.jhr())?;
        file.try_lock_exclusive().map_err(|_| BaseError::Locked)?;
        Ok(file)
    }

    fn index_count(&self) -> BaseResult<u32> {
        Ok((self.paths.jdx().metadata()?.len() / INDEX_RECORD_LEN as u64) as u32)
    }

    /// Appends `hdr` (with `msgnum`/`offset`/`txt_len`/timestamps filled
    /// in by this call) and `text`. Returns the assigned msgnum.
    ///
    /// Write order is data, then header, then index, fsyncing each file
    /// before the next — a crash between any two steps leaves the base
    /// in a state `fix` can repair (spec.md §4.1 "Write ordering").
    pub fn post(&self, mut hdr: MessageHeader, text: &[u8]) -> BaseResult<u32> {
        let _lock = self.lock_jhr_exclusive()?;
        let mut state = self.state.lock().unwrap();

        let ordinal = self.index_count()?;
        let msgnum = state.base_msg_num + ordinal;

        let mut jdt = OpenOptions::new().append(true).open(self.paths.jdt())?;
        let offset = jdt.metadata()?.len();
        jdt.write_all(text)?;
        jdt.sync_all()?;

        hdr.msgnum = msgnum;
        hdr.offset = offset as u32;
        hdr.txt_len = text.len() as u32;
        hdr.times_read = 0;
        hdr.date_received = Utc::now().timestamp() as u32;
        hdr.date_processed = 0;

        let mut hdr_buf = Vec::new();
        hdr.encode(&mut hdr_buf)
            .map_err(|e| BaseError::Corrupt(e.to_string()))?;
        let mut jhr = OpenOptions::new().append(true).open(self.paths.jhr())?;
        jhr.write_all(&hdr_buf)?;
        jhr.sync_all()?;

        let to_crc = hdr
            .subfield_by_lo_id(jam_types::subfield::lo_id::RECEIVER_NAME)
            .map(|sf| crc32_lowercase(&sf.as_str()))
            .unwrap_or(0);
        // Position before we appended hdr_buf above is the record's offset.
        let hdr_offset = jhr.metadata()?.len() - hdr_buf.len() as u64;
        let index_rec = IndexRecord {
            to_crc,
            hdr_offset: hdr_offset as u32,
        };
        let mut idx_buf = Vec::new();
        index_rec
            .encode(&mut idx_buf)
            .expect("index record encode is infallible");
        let mut jdx = OpenOptions::new().append(true).open(self.paths.jdx())?;
        jdx.write_all(&idx_buf)?;
        jdx.sync_all()?;

        state.active_msgs += 1;
        state.mod_counter += 1;
        self.write_fixed_header(&state)?;

        log::debug!("posted msgnum {msgnum} ({} bytes text)", text.len());
        Ok(msgnum)
    }

    fn write_fixed_header(&self, fixed: &FixedHeader) -> BaseResult<()> {
        let mut buf = Vec::new();
        fixed
            .encode(&mut buf)
            .expect("fixed header encode is infallible");
        let mut jhr = OpenOptions::new().write(true).open(self.paths.jhr())?;
        jhr.seek(SeekFrom::Start(0))?;
        jhr.write_all(&buf)?;
        jhr.sync_all()?;
        Ok(())
    }

    fn index_record_at(&self, ordinal: u32) -> BaseResult<IndexRecord> {
        let mut jdx = File::open(self.paths.jdx())?;
        jdx.seek(SeekFrom::Start(ordinal as u64 * INDEX_RECORD_LEN as u64))?;
        let mut buf = vec![0u8; INDEX_RECORD_LEN];
        jdx.read_exact(&mut buf)?;
        let (_, rec) = IndexRecord::decode(&buf).map_err(|e| BaseError::Corrupt(e.to_string()))?;
        Ok(rec)
    }

    /// Decodes every header record in `.jhr` in file order, independent
    /// of `.jdx`, alongside the byte offset each one starts at. Used by
    /// `fix --repair` to rebuild a misaligned `.jdx` from scratch
    /// (spec.md §8 test 21), since the normal index-driven scan can't
    /// be trusted when the index itself is what's broken.
    pub(crate) fn scan_headers_raw(&self) -> BaseResult<Vec<(u32, MessageHeader)>> {
        let bytes = std::fs::read(self.paths.jhr())?;
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(BaseError::Corrupt(format!(
                "{}: file shorter than fixed header",
                self.paths.jhr().display()
            )));
        }
        let mut offset = FIXED_HEADER_LEN;
        let mut out = Vec::new();
        while offset < bytes.len() {
            let (rest, hdr) = MessageHeader::decode(&bytes[offset..])
                .map_err(|e| BaseError::Corrupt(e.to_string()))?;
            let consumed = bytes.len() - offset - rest.len();
            out.push((offset as u32, hdr));
            offset += consumed;
        }
        Ok(out)
    }

    pub(crate) fn header_at_offset(&self, offset: u32) -> BaseResult<MessageHeader> {
        let mut jhr = File::open(self.paths.jhr())?;
        let len = jhr.metadata()?.len();
        jhr.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = Vec::new();
        jhr.take(len.saturating_sub(offset as u64)).read_to_end(&mut buf)?;
        let (_, hdr) = MessageHeader::decode(&buf).map_err(|e| BaseError::Corrupt(e.to_string()))?;
        Ok(hdr)
    }

    pub fn read_header(&self, msgnum: u32) -> BaseResult<MessageHeader> {
        let base_msg_num = self.base_msg_num();
        let ordinal = msgnum
            .checked_sub(base_msg_num)
            .ok_or(BaseError::NotFound(msgnum))?;
        if ordinal >= self.index_count()? {
            return Err(BaseError::NotFound(msgnum));
        }
        let index_rec = self.index_record_at(ordinal)?;
        self.header_at_offset(index_rec.hdr_offset)
    }

    pub fn read_text(&self, hdr: &MessageHeader) -> BaseResult<Vec<u8>> {
        let mut jdt = File::open(self.paths.jdt())?;
        let len = jdt.metadata()?.len();
        let end = hdr.offset as u64 + hdr.txt_len as u64;
        if end > len {
            return Err(BaseError::Corrupt(format!(
                "text block for offset {} overruns .jdt (end {end} > size {len})",
                hdr.offset
            )));
        }
        jdt.seek(SeekFrom::Start(hdr.offset as u64))?;
        let mut buf = vec![0u8; hdr.txt_len as usize];
        jdt.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Overwrite an existing header's fixed-prefix fields in place.
    /// Rejects any change that alters the record's encoded length,
    /// since that would require growing the file (use `pack` instead).
    pub fn update_header(&self, msgnum: u32, hdr: &MessageHeader) -> BaseResult<()> {
        let _lock = self.lock_jhr_exclusive()?;
        let mut state = self.state.lock().unwrap();

        let base_msg_num = state.base_msg_num;
        let ordinal = msgnum
            .checked_sub(base_msg_num)
            .ok_or(BaseError::NotFound(msgnum))?;
        if ordinal >= self.index_count()? {
            return Err(BaseError::NotFound(msgnum));
        }
        let index_rec = self.index_record_at(ordinal)?;
        let old = self.header_at_offset(index_rec.hdr_offset)?;

        let old_len = encoded_len(&old);
        let new_len = encoded_len(hdr);
        if old_len != new_len {
            return Err(BaseError::SubfieldLenChanged {
                old: old_len,
                new: new_len,
            });
        }

        let mut buf = Vec::new();
        hdr.encode(&mut buf)
            .map_err(|e| BaseError::Corrupt(e.to_string()))?;
        let mut jhr = OpenOptions::new().write(true).open(self.paths.jhr())?;
        jhr.seek(SeekFrom::Start(index_rec.hdr_offset as u64))?;
        jhr.write_all(&buf)?;
        jhr.sync_all()?;

        state.mod_counter += 1;
        self.write_fixed_header(&state)?;
        Ok(())
    }

    /// Sets `Attribute::DELETED` on the header and mirrors it in the
    /// index record's high bit, decrementing `ActiveMsgs`.
    pub fn delete(&self, msgnum: u32) -> BaseResult<()> {
        let mut hdr = self.read_header(msgnum)?;
        if hdr.is_deleted() {
            return Ok(());
        }
        hdr.attribute |= jam_types::Attribute::DELETED;

        let _lock = self.lock_jhr_exclusive()?;
        let mut state = self.state.lock().unwrap();
        let ordinal = msgnum - state.base_msg_num;
        let mut index_rec = self.index_record_at(ordinal)?;

        let mut hdr_buf = Vec::new();
        hdr.encode(&mut hdr_buf)
            .map_err(|e| BaseError::Corrupt(e.to_string()))?;
        let mut jhr = OpenOptions::new().write(true).open(self.paths.jhr())?;
        jhr.seek(SeekFrom::Start(index_rec.hdr_offset as u64))?;
        jhr.write_all(&hdr_buf)?;
        jhr.sync_all()?;

        index_rec.mark_deleted();
        let mut idx_buf = Vec::new();
        index_rec
            .encode(&mut idx_buf)
            .expect("index record encode is infallible");
        let mut jdx = OpenOptions::new().write(true).open(self.paths.jdx())?;
        jdx.seek(SeekFrom::Start(ordinal as u64 * INDEX_RECORD_LEN as u64))?;
        jdx.write_all(&idx_buf)?;
        jdx.sync_all()?;

        state.active_msgs = state.active_msgs.saturating_sub(1);
        state.mod_counter += 1;
        self.write_fixed_header(&state)?;
        Ok(())
    }

    /// Non-deleted headers in ascending msgnum order, from `start_msgnum`
    /// up to `max` results. A lazy iterator isn't worth the extra
    /// complexity here: bases are scanned in full during toss/pack/link
    /// runs anyway, so this returns a materialised `Vec`.
    pub fn scan_headers(&self, start_msgnum: u32, max: usize) -> BaseResult<Vec<MessageHeader>> {
        let base_msg_num = self.base_msg_num();
        let count = self.index_count()?;
        let mut out = Vec::new();
        for ordinal in 0..count {
            let msgnum = base_msg_num + ordinal;
            if msgnum < start_msgnum {
                continue;
            }
            let index_rec = self.index_record_at(ordinal)?;
            if index_rec.is_deleted() {
                continue;
            }
            let hdr = self.header_at_offset(index_rec.hdr_offset)?;
            if hdr.is_deleted() {
                continue;
            }
            out.push(hdr);
            if out.len() >= max {
                break;
            }
        }
        Ok(out)
    }

    pub fn get_last_read(&self, user_handle: &str) -> BaseResult<LastReadRecord> {
        let crc = crc32_lowercase(user_handle);
        let mut jlr = File::open(self.paths.jlr())?;
        let count = jlr.metadata()?.len() / LASTREAD_RECORD_LEN as u64;
        let mut buf = vec![0u8; LASTREAD_RECORD_LEN];
        for _ in 0..count {
            jlr.read_exact(&mut buf)?;
            let (_, rec) = LastReadRecord::decode(&buf).map_err(|e| BaseError::Corrupt(e.to_string()))?;
            if rec.user_crc == crc {
                return Ok(rec);
            }
        }
        Err(BaseError::NoLastRead(user_handle.to_string()))
    }

    pub fn set_last_read(&self, user_handle: &str, rec: LastReadRecord) -> BaseResult<()> {
        let crc = crc32_lowercase(user_handle);
        let mut jlr = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.paths.jlr())?;
        let count = jlr.metadata()?.len() / LASTREAD_RECORD_LEN as u64;
        let mut buf = vec![0u8; LASTREAD_RECORD_LEN];
        for i in 0..count {
            jlr.read_exact(&mut buf)?;
            let (_, existing) = LastReadRecord::decode(&buf).map_err(|e| BaseError::Corrupt(e.to_string()))?;
            if existing.user_crc == crc {
                let mut out = Vec::new();
                rec.encode(&mut out).expect("lastread record encode is infallible");
                jlr.seek(SeekFrom::Start(i * LASTREAD_RECORD_LEN as u64))?;
                jlr.write_all(&out)?;
                jlr.sync_all()?;
                return Ok(());
            }
        }
        let mut out = Vec::new();
        rec.encode(&mut out).expect("lastread record encode is infallible");
        jlr.seek(SeekFrom::End(0))?;
        jlr.write_all(&out)?;
        jlr.sync_all()?;
        Ok(())
    }

    pub fn paths(&self) -> &BasePaths {
        &self.paths
    }

    /// A snapshot of the fixed header, for callers (e.g. `stats`) that
    /// need fields beyond the individual accessors above.
    pub fn fixed_snapshot(&self) -> FixedHeader {
        self.state.lock().unwrap().clone()
    }

    pub(crate) fn replace_fixed(&self, fixed: FixedHeader) -> BaseResult<()> {
        let mut state = self.state.lock().unwrap();
        *state = fixed.clone();
        self.write_fixed_header(&fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::{Attribute, Attribute2, Subfield};
    use tempfile::tempdir;

    fn draft_header() -> MessageHeader {
        MessageHeader {
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
            subfields: vec![
                Subfield::SenderName(b"alice".to_vec()),
                Subfield::ReceiverName(b"bob".to_vec()),
                Subfield::Subject(b"hi".to_vec()),
            ],
        }
    }

    #[test]
    fn post_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let msgnum = base.post(draft_header(), b"hello\r").unwrap();
        assert_eq!(msgnum, 1);
        assert_eq!(base.active_msgs(), 1);

        let hdr = base.read_header(msgnum).unwrap();
        let text = base.read_text(&hdr).unwrap();
        assert_eq!(text, b"hello\r");
    }

    #[test]
    fn zero_length_text_posts_and_reads_back_empty() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let msgnum = base.post(draft_header(), b"").unwrap();
        let hdr = base.read_header(msgnum).unwrap();
        assert_eq!(hdr.txt_len, 0);
        assert!(base.read_text(&hdr).unwrap().is_empty());
    }

    #[test]
    fn delete_clears_active_count_but_keeps_base_msg_num() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let first = base.post(draft_header(), b"one\r").unwrap();
        let _second = base.post(draft_header(), b"two\r").unwrap();
        base.delete(first).unwrap();
        assert_eq!(base.active_msgs(), 1);
        assert_eq!(base.base_msg_num(), 1);
    }

    #[test]
    fn update_header_rejects_length_change() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let msgnum = base.post(draft_header(), b"hello\r").unwrap();
        let mut hdr = base.read_header(msgnum).unwrap();
        hdr.subfields.push(Subfield::Pid(b"extra".to_vec()));
        assert!(matches!(
            base.update_header(msgnum, &hdr),
            Err(BaseError::SubfieldLenChanged { .. })
        ));
    }

    #[test]
    fn update_header_accepts_same_length_change() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        let msgnum = base.post(draft_header(), b"hello\r").unwrap();
        let mut hdr = base.read_header(msgnum).unwrap();
        hdr.reply_to = 99;
        base.update_header(msgnum, &hdr).unwrap();
        let reread = base.read_header(msgnum).unwrap();
        assert_eq!(reread.reply_to, 99);
    }

    #[test]
    fn last_read_upserts() {
        let dir = tempdir().unwrap();
        let base = Base::create(dir.path().join("general"), 1).unwrap();
        assert!(base.get_last_read("alice").is_err());
        let rec = LastReadRecord {
            user_crc: crc32_lowercase("alice"),
            user_id: 1,
            last_read_msg: 5,
            high_read_msg: 5,
        };
        base.set_last_read("alice", rec).unwrap();
        assert_eq!(base.get_last_read("alice").unwrap().last_read_msg, 5);

        let rec2 = LastReadRecord {
            last_read_msg: 7,
            high_read_msg: 7,
            ..rec
        };
        base.set_last_read("alice", rec2).unwrap();
        assert_eq!(base.get_last_read("alice").unwrap().last_read_msg, 7);
    }
}
