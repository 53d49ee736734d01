//! Resolves the four co-located files sharing a base's path prefix.

use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct BasePaths {
    prefix: PathBuf,
}

impl BasePaths {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn jhr(&self) -> PathBuf {
        self.with_ext("jhr")
    }

    pub fn jdt(&self) -> PathBuf {
        self.with_ext("jdt")
    }

    pub fn jdx(&self) -> PathBuf {
        self.with_ext("jdx")
    }

    pub fn jlr(&self) -> PathBuf {
        self.with_ext("jlr")
    }

    fn with_ext(&self, ext: &str) -> PathBuf {
        let mut p = self.prefix.clone().into_os_string();
        p.push(".");
        p.push(ext);
        PathBuf::from(p)
    }

    /// Renamed-aside name used for the old files during pack, e.g.
    /// `general.jhr.bak.1700000000`.
    pub fn backup(path: &Path, timestamp: i64) -> PathBuf {
        let mut p = path.as_os_str().to_owned();
        p.push(format!(".bak.{timestamp}"));
        PathBuf::from(p)
    }

    /// Staging name used for a freshly rewritten file during pack, e.g.
    /// `general.jhr.new`.
    pub fn staging(path: &Path) -> PathBuf {
        let mut p = path.as_os_str().to_owned();
        p.push(".new");
        PathBuf::from(p)
    }
}
