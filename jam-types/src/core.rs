//! Core string types
//!
//! JAM and FTN both truncate free-text fields (subject, from, to) to a
//! configured byte cap before they are encoded. [`Capped`] is a thin
//! newtype that performs that truncation once, at construction, so the
//! codec layer never has to re-check lengths.
//!
//! ```text
//! ┌────────┐   truncate-to-cap    ┌────────┐
//! │  &str  │ ────────────────────▶│ Capped │
//! └────────┘                      └────────┘
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A byte string truncated to `N` bytes on construction.
///
/// JAM stores `SenderName`/`ReceiverName`/`Subject` as raw bytes inside a
/// subfield; the classic caps are 35/35/71 bytes respectively (see
/// [`SENDER_CAP`], [`RECEIVER_CAP`], [`SUBJECT_CAP`]).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capped<const N: usize>(String);

impl<const N: usize> Capped<N> {
    pub fn new(value: impl Into<String>) -> Self {
        let mut value = value.into();
        if value.len() > N {
            let mut cut = N;
            while cut > 0 && !value.is_char_boundary(cut) {
                cut -= 1;
            }
            value.truncate(cut);
        }
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub const fn cap() -> usize {
        N
    }
}

impl<const N: usize> fmt::Display for Capped<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> From<&str> for Capped<N> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<String> for Capped<N> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Classic JAM truncation cap for `SenderName`/`ReceiverName`.
pub const NAME_CAP: usize = 35;
/// Classic JAM truncation cap for `Subject`.
pub const SUBJECT_CAP: usize = 71;

pub type SenderName = Capped<NAME_CAP>;
pub type ReceiverName = Capped<NAME_CAP>;
pub type Subject = Capped<SUBJECT_CAP>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_cap() {
        let name: SenderName = "a".repeat(40).as_str().into();
        assert_eq!(name.as_str().len(), NAME_CAP);
    }

    #[test]
    fn keeps_short_values() {
        let name: SenderName = "Alice".into();
        assert_eq!(name.as_str(), "Alice");
    }

    #[test]
    fn truncates_on_char_boundary() {
        // 36 bytes of 2-byte UTF-8 characters; cap is 35, so a naive
        // byte-truncate would split the last character.
        let s = "é".repeat(18); // 36 bytes
        let name: SenderName = s.as_str().into();
        assert!(name.as_str().len() <= NAME_CAP);
        assert!(std::str::from_utf8(name.as_str().as_bytes()).is_ok());
    }
}
