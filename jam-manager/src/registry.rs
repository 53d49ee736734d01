//! Area registry persistence (spec.md §3.2, §6.1 config concerns).

use std::fs;
use std::path::Path;

use jam_types::Area;

use crate::error::ManagerResult;

/// Loads the area registry from a JSON array of [`Area`] at `path`.
pub fn load(path: impl AsRef<Path>) -> ManagerResult<Vec<Area>> {
    let bytes = fs::read(path.as_ref())?;
    let areas: Vec<Area> = serde_json::from_slice(&bytes)
        .map_err(|e| jam_base::BaseError::Corrupt(format!("{}: {e}", path.as_ref().display())))?;
    Ok(areas)
}

/// Writes the area registry to `path` as a pretty-printed JSON array.
pub fn save(path: impl AsRef<Path>, areas: &[Area]) -> ManagerResult<()> {
    let bytes = serde_json::to_vec_pretty(areas).expect("area registry is always serializable");
    fs::write(path, bytes)?;
    Ok(())
}

/// Areas sorted by `id`, the order `ListAreas` promises (spec.md §4.2).
pub fn sorted(mut areas: Vec<Area>) -> Vec<Area> {
    areas.sort_by_key(|a| a.id);
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_types::AreaKind;
    use tempfile::tempdir;

    fn sample(id: u32, tag: &str) -> Area {
        Area {
            id,
            tag: tag.to_string(),
            name: tag.to_string(),
            kind: AreaKind::Local,
            base_path: format!("/d/msgbases/{tag}"),
            read_acs: String::new(),
            write_acs: String::new(),
            max_messages: None,
            max_age_days: None,
            origin_line: None,
            network_tag: None,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("areas.json");
        let areas = vec![sample(2, "util"), sample(1, "general")];
        save(&path, &areas).unwrap();
        let reloaded = load(&path).unwrap();
        assert_eq!(sorted(reloaded), vec![sample(1, "general"), sample(2, "util")]);
    }
}
