#![deny(missing_debug_implementations)]

//! Persistent MSGID fingerprint set used to suppress re-imported
//! messages across toss runs (component C3).

mod fingerprint;

pub mod error;

pub use error::{DupeDbError, DupeDbResult};
pub use fingerprint::Fingerprint;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Default retention horizon: entries older than this are evicted on
/// each [`DupeDb::prune`] (spec.md §3.3).
pub const DEFAULT_HORIZON_SECS: i64 = 30 * 24 * 3600;

/// Hard cap on set size regardless of age, so a misconfigured horizon
/// (or a flood of distinct fingerprints within the horizon) cannot
/// grow the file without bound. When exceeded, the oldest entries are
/// evicted first.
pub const MAX_ENTRIES: usize = 200_000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OnDisk {
    /// fingerprint -> first-seen UNIX seconds.
    seen: HashMap<String, i64>,
}

/// A persistent set of seen fingerprints, backed by a single JSON file
/// (spec.md §6.1 "Dupe DB"). One process-wide mutex guards all access;
/// lookups and inserts are cheap enough that a single lock is not a
/// bottleneck (spec.md §5).
#[derive(Debug)]
pub struct DupeDb {
    path: PathBuf,
    state: Mutex<OnDisk>,
}

impl DupeDb {
    /// Loads the set from `path`, or starts empty if the file does not
    /// yet exist.
    pub fn open(path: impl Into<PathBuf>) -> DupeDbResult<Self> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| DupeDbError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => OnDisk::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn seen(&self, fingerprint: &Fingerprint) -> bool {
        self.state.lock().unwrap().seen.contains_key(fingerprint.as_str())
    }

    /// Records `fingerprint` as seen right now. A second `record` of an
    /// already-seen fingerprint keeps the original first-seen time.
    pub fn record(&self, fingerprint: Fingerprint) {
        let mut state = self.state.lock().unwrap();
        state
            .seen
            .entry(fingerprint.as_str().to_string())
            .or_insert_with(|| Utc::now().timestamp());
    }

    /// Evicts entries older than `horizon` seconds, then, if the set is
    /// still over [`MAX_ENTRIES`], evicts the oldest survivors until it
    /// isn't. Returns the number of entries removed.
    pub fn prune(&self, horizon_secs: i64) -> usize {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now().timestamp();
        let before = state.seen.len();

        state.seen.retain(|_, first_seen| now - *first_seen < horizon_secs);

        if state.seen.len() > MAX_ENTRIES {
            let mut by_age: Vec<(String, i64)> =
                state.seen.iter().map(|(k, v)| (k.clone(), *v)).collect();
            by_age.sort_by_key(|(_, ts)| *ts);
            let excess = state.seen.len() - MAX_ENTRIES;
            for (fp, _) in by_age.into_iter().take(excess) {
                state.seen.remove(&fp);
            }
        }

        before - state.seen.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the full set to `self.path` via write-temp-then-rename
    /// (spec.md §3.5), so a crash mid-write never leaves a truncated
    /// file in the canonical location.
    pub fn persist(&self) -> DupeDbResult<()> {
        let state = self.state.lock().unwrap();
        let bytes = serde_json::to_vec_pretty(&*state).expect("dupe db state is always serializable");
        let tmp = Self::staging_path(&self.path);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn staging_path(path: &Path) -> PathBuf {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unseen_fingerprint_reports_false() {
        let dir = tempdir().unwrap();
        let db = DupeDb::open(dir.path().join("dupe.json")).unwrap();
        let fp = Fingerprint::from_msgid("1:1/1 1");
        assert!(!db.seen(&fp));
    }

    #[test]
    fn record_then_seen_is_true() {
        let dir = tempdir().unwrap();
        let db = DupeDb::open(dir.path().join("dupe.json")).unwrap();
        let fp = Fingerprint::from_msgid("1:1/1 1");
        db.record(fp.clone());
        assert!(db.seen(&fp));
    }

    #[test]
    fn persist_then_reopen_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dupe.json");
        let fp = Fingerprint::from_msgid("1:1/1 1");
        {
            let db = DupeDb::open(&path).unwrap();
            db.record(fp.clone());
            db.persist().unwrap();
        }
        let reopened = DupeDb::open(&path).unwrap();
        assert!(reopened.seen(&fp));
    }

    #[test]
    fn prune_evicts_entries_past_the_horizon() {
        let dir = tempdir().unwrap();
        let db = DupeDb::open(dir.path().join("dupe.json")).unwrap();
        {
            let mut state = db.state.lock().unwrap();
            state.seen.insert("ancient".to_string(), 0);
        }
        db.record(Fingerprint::from_msgid("fresh"));
        let removed = db.prune(DEFAULT_HORIZON_SECS);
        assert_eq!(removed, 1);
        assert!(db.seen(&Fingerprint::from_msgid("fresh")));
        assert!(!db.seen(&Fingerprint::from_msgid("ancient")));
    }

    #[test]
    fn second_record_keeps_original_first_seen_time() {
        let dir = tempdir().unwrap();
        let db = DupeDb::open(dir.path().join("dupe.json")).unwrap();
        let fp = Fingerprint::from_msgid("1:1/1 1");
        {
            let mut state = db.state.lock().unwrap();
            state.seen.insert(fp.as_str().to_string(), 12345);
        }
        db.record(fp.clone());
        assert_eq!(db.state.lock().unwrap().seen[fp.as_str()], 12345);
    }
}
