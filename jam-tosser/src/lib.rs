#![deny(missing_debug_implementations)]

//! Inbound unpack/dedup/import pipeline and outbound scan/export/bundle
//! pipeline, driven against an area map in the AREAS.BBS tradition
//! (component C5).

mod area_map;
mod archive;
mod fingerprint;
mod inbound;
mod outbound;

pub mod error;

pub use archive::{bundle_filename, is_archive, weekday_digit, BUNDLE_ARCHIVER_CODE};
pub use area_map::parse as parse_area_map;
pub use error::{TosserError, TosserResult};
pub use inbound::{process_inbound, InboundConfig, TossIssue, TossReport};
pub use outbound::{pack_outbound, scan_and_export, ScanReport, MAX_PACKET_BYTES};
