//! AREAS.BBS-style area map parsing (spec.md §6.1).
//!
//! The line format is `<tag> <base-path> <uplink-addr> [<uplink-addr>...]`,
//! with `#` starting a comment. A JSON alternate is accepted when the
//! file starts with `{` or `[`, carrying the same fields plus an
//! explicit `passthrough` flag the line format has no room for.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jam_types::{AreaMapEntry, FtnAddress};

use crate::error::{TosserError, TosserResult};

/// Parses an AREAS.BBS-style map for `network`, resolving relative
/// base paths against `bbs_root` (spec.md §6.3).
pub fn parse(network: &str, text: &str, bbs_root: &Path) -> TosserResult<HashMap<String, (PathBuf, AreaMapEntry)>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return parse_json(text, bbs_root);
    }

    let mut out = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let tag = fields
            .next()
            .ok_or_else(|| TosserError::UnknownAreaTag(line.to_string()))?;
        let base_path = fields
            .next()
            .ok_or_else(|| TosserError::UnknownAreaTag(line.to_string()))?;
        let uplinks: Vec<FtnAddress> = fields
            .map(FtnAddress::from_str)
            .collect::<Result<_, _>>()
            .map_err(|_| TosserError::UnknownAreaTag(line.to_string()))?;

        out.insert(
            tag.to_string(),
            (
                resolve(bbs_root, base_path),
                AreaMapEntry {
                    network: network.to_string(),
                    uplinks,
                    passthrough: false,
                },
            ),
        );
    }
    Ok(out)
}

#[derive(serde::Deserialize)]
struct JsonEntry {
    tag: String,
    base_path: String,
    network: String,
    uplinks: Vec<String>,
    #[serde(default)]
    passthrough: bool,
}

fn parse_json(text: &str, bbs_root: &Path) -> TosserResult<HashMap<String, (PathBuf, AreaMapEntry)>> {
    let entries: Vec<JsonEntry> = serde_json::from_str(text)
        .map_err(|e| TosserError::UnknownAreaTag(format!("invalid area map JSON: {e}")))?;
    let mut out = HashMap::new();
    for entry in entries {
        let uplinks = entry
            .uplinks
            .iter()
            .map(|s| FtnAddress::from_str(s))
            .collect::<Result<_, _>>()
            .map_err(|_| TosserError::UnknownAreaTag(entry.tag.clone()))?;
        out.insert(
            entry.tag.clone(),
            (
                resolve(bbs_root, &entry.base_path),
                AreaMapEntry {
                    network: entry.network,
                    uplinks,
                    passthrough: entry.passthrough,
                },
            ),
        );
    }
    Ok(out)
}

fn resolve(bbs_root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        bbs_root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_format_with_comments() {
        let text = "# comment\nUTIL /d/msgbases/util 1:1/10\nGENERAL msgbases/general 1:1/10 1:1/11\n";
        let map = parse("fidonet", text, Path::new("/d")).unwrap();
        assert_eq!(map.len(), 2);
        let (path, entry) = &map["GENERAL"];
        assert_eq!(path, &PathBuf::from("/d/msgbases/general"));
        assert_eq!(entry.uplinks.len(), 2);
        assert_eq!(entry.network, "fidonet");
    }

    #[test]
    fn parses_json_form() {
        let text = r#"[{"tag":"UTIL","base_path":"/d/msgbases/util","network":"fidonet","uplinks":["1:1/10"],"passthrough":true}]"#;
        let map = parse("fidonet", text, Path::new("/d")).unwrap();
        let (_, entry) = &map["UTIL"];
        assert!(entry.passthrough);
    }

    #[test]
    fn rejects_malformed_uplink() {
        let text = "UTIL /d/msgbases/util not-an-address\n";
        assert!(parse("fidonet", text, Path::new("/d")).is_err());
    }
}
