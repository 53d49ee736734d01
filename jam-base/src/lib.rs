#![deny(missing_debug_implementations)]

//! The on-disk JAM message base engine (component C1): open, post,
//! read, update, delete, pack, and fix against the four files a base
//! is made of. Byte-level encoding lives in `jam-codec`; this crate
//! owns file layout, locking, and write ordering.

mod base;
mod fix;
mod pack;
mod paths;

pub mod error;

pub use base::Base;
pub use error::{BaseError, BaseResult};
pub use fix::FixReport;
pub use paths::BasePaths;
