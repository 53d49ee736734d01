//! Area registry and FTN area map entities (spec.md §3.2).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ftn::FtnAddress;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AreaKind {
    Local,
    Echo,
    Net,
}

/// A message area as carried in the area registry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Area {
    pub id: u32,
    pub tag: String,
    pub name: String,
    pub kind: AreaKind,
    pub base_path: String,
    pub read_acs: String,
    pub write_acs: String,
    pub max_messages: Option<u32>,
    pub max_age_days: Option<u32>,
    pub origin_line: Option<String>,
    pub network_tag: Option<String>,
}

/// `tag -> {network, uplinks[], passthrough?}` from the FTN area map.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaMapEntry {
    pub network: String,
    pub uplinks: Vec<FtnAddress>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub passthrough: bool,
}
