//! Archive bundle handling: inbound extraction and outbound bundling
//! under the FTN weekday-rotating filename convention (spec.md §6.1,
//! §9 "Open questions" — lowercase chosen, tolerant on inbound).

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

use jam_types::FtnAddress;

use crate::error::TosserResult;

/// Two-letter archiver code this core produces bundles under. Inbound
/// recognition is tolerant of any two-letter code (some peers use
/// their own), only the trailing weekday digit is meaningful to us.
pub const BUNDLE_ARCHIVER_CODE: &str = "su";

fn netnode_hex(addr: &FtnAddress) -> String {
    format!("{:04x}{:04x}", addr.net, addr.node)
}

/// Sunday = 0 .. Saturday = 6, matching `chrono::Weekday::num_days_from_sunday`.
pub fn weekday_digit(at: DateTime<Utc>) -> u32 {
    at.weekday().num_days_from_sunday()
}

/// The lowercase, lowercase-tolerant-on-read bundle filename this core
/// writes for `addr` on the day `at` falls on, e.g. `00010002.su3`.
pub fn bundle_filename(addr: &FtnAddress, at: DateTime<Utc>) -> String {
    format!(
        "{}.{}{}",
        netnode_hex(addr),
        BUNDLE_ARCHIVER_CODE,
        weekday_digit(at)
    )
}

/// Whether `ext` looks like an FTN weekday-rotating bundle extension:
/// two ASCII letters followed by a single digit 0-6. Case-insensitive,
/// archiver-code-agnostic, since third-party tossers use their own
/// two-letter code (spec.md §9).
pub fn is_bundle_extension(ext: &str) -> bool {
    let bytes = ext.as_bytes();
    bytes.len() == 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1].is_ascii_alphabetic()
        && bytes[2].is_ascii_digit()
        && bytes[2] <= b'6'
}

/// Whether `path`'s extension marks it as something this core's
/// inbound scan should try to unpack: a `.zip`, or a weekday bundle
/// extension.
pub fn is_archive(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("zip") => true,
        Some(ext) => is_bundle_extension(ext),
        None => false,
    }
}

/// Extracts every entry of the ZIP (or ZIP-with-a-bundle-extension)
/// archive at `path` into `dest_dir`, returning the extracted paths.
pub fn extract(path: &Path, dest_dir: &Path) -> TosserResult<Vec<PathBuf>> {
    fs::create_dir_all(dest_dir)?;
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(name) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };
        let out_path = dest_dir.join(&name);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        extracted.push(out_path);
    }
    Ok(extracted)
}

/// Bundles `files` into a new ZIP archive at `dest_path`, storing each
/// under its file name only (flat archive, matching classic ArcMail
/// bundles).
pub fn bundle(dest_path: &Path, files: &[PathBuf]) -> TosserResult<()> {
    let file = File::create(dest_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("packet.pkt")
            .to_string();
        writer.start_file(name, options)?;
        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        io::copy(&mut buf.as_slice(), &mut writer)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn bundle_filename_matches_spec_example() {
        let addr = FtnAddress::new(1, 1, 2, 0);
        // 2026-08-02 is a Sunday.
        let at = Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap();
        assert_eq!(bundle_filename(&addr, at), "00010002.su0");
    }

    #[test]
    fn recognises_bundle_extensions_case_insensitively() {
        assert!(is_bundle_extension("su0"));
        assert!(is_bundle_extension("SU6"));
        assert!(!is_bundle_extension("su7"));
        assert!(!is_bundle_extension("zip"));
    }

    #[test]
    fn is_archive_accepts_zip_and_bundle_extensions() {
        assert!(is_archive(Path::new("inbound.zip")));
        assert!(is_archive(Path::new("00010002.MO3")));
        assert!(!is_archive(Path::new("0001.pkt")));
    }

    #[test]
    fn bundle_then_extract_round_trips_file_contents() {
        let dir = tempdir().unwrap();
        let payload = dir.path().join("one.pkt");
        fs::write(&payload, b"packet bytes").unwrap();

        let bundle_path = dir.path().join("out.zip");
        bundle(&bundle_path, &[payload]).unwrap();

        let extract_dir = dir.path().join("extracted");
        let files = extract(&bundle_path, &extract_dir).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read(&files[0]).unwrap(), b"packet bytes");
    }
}
