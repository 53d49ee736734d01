//! Byte-level codec for the four JAM record families.

pub mod fixed_header;
pub mod index;
pub mod lastread;
pub mod message_header;
pub mod subfield;

pub use fixed_header::FIXED_HEADER_LEN;
pub use index::INDEX_RECORD_LEN;
pub use lastread::LASTREAD_RECORD_LEN;
pub use message_header::{encoded_len, MESSAGE_HEADER_PREFIX_LEN};
