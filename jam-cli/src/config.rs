//! BBS root layout and the small JSON config that ties it together
//! (spec.md §6.3 "Environment").
//!
//! A BBS root looks like:
//!
//! ```text
//! <root>/config/jam-core.json   -- this file
//! <root>/config/areas.json      -- area registry (jam_manager::registry format)
//! <root>/data/dupedb.json       -- default dupe DB location
//! ```
//!
//! Every relative path in the config is resolved against the root, so
//! commands behave the same regardless of the operator's CWD.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use anyhow::{Context, Result};

fn default_areas_file() -> String {
    "config/areas.json".to_string()
}

fn default_dupedb_path() -> String {
    "data/dupedb.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub area_map: String,
    pub inbound: String,
    #[serde(default)]
    pub secure_inbound: Option<String>,
    #[serde(default = "default_bad_path")]
    pub bad: String,
    pub outbound: String,
    #[serde(default)]
    pub uplinks: Vec<String>,
}

fn default_bad_path() -> String {
    "inbound/bad".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    pub local_address: String,
    #[serde(default = "default_areas_file")]
    pub areas_file: String,
    #[serde(default = "default_dupedb_path")]
    pub dupedb_path: String,
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
}

/// A loaded config plus the root it was resolved against.
#[derive(Debug)]
pub struct BbsRoot {
    pub root: PathBuf,
    pub config: RootConfig,
}

impl BbsRoot {
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with(root, None)
    }

    /// Loads the root config, optionally reading `jam-core.json` from
    /// `config_dir` instead of `<root>/config` (the CLI's `--config`
    /// flag; spec.md §6.2).
    pub fn load_with(root: impl Into<PathBuf>, config_dir: Option<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config_dir = config_dir.unwrap_or_else(|| root.join("config"));
        let config_path = config_dir.join("jam-core.json");
        let bytes = std::fs::read(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: RootConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(Self { root, config })
    }

    /// The BBS root is the parent of the data directory (spec.md §6.3).
    /// `--data DIR` resolves it directly; absent that, `JAM_BBS_ROOT`
    /// is used, falling back to the current directory so commands work
    /// the same regardless of CWD (spec.md §6.3).
    pub fn resolve_root(data_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(data) = data_dir {
            return Ok(data.parent().map(Path::to_path_buf).unwrap_or_else(|| data.to_path_buf()));
        }
        if let Ok(root) = std::env::var("JAM_BBS_ROOT") {
            return Ok(PathBuf::from(root));
        }
        std::env::current_dir().context("resolving BBS root from current directory")
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        let p = Path::new(relative);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn areas_path(&self) -> PathBuf {
        self.resolve(&self.config.areas_file)
    }

    pub fn dupedb_path(&self) -> PathBuf {
        self.resolve(&self.config.dupedb_path)
    }

    pub fn local_address(&self) -> Result<jam_types::FtnAddress> {
        self.config
            .local_address
            .parse()
            .with_context(|| format!("invalid local_address {:?}", self.config.local_address))
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.config
            .networks
            .get(name)
            .with_context(|| format!("no network {name:?} configured in jam-core.json"))
    }
}
