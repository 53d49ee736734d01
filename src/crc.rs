//! CRC-32 helpers. JAM hashes names case-insensitively by lowercasing
//! before hashing; the dupe DB hashes raw text.

/// CRC-32 of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// CRC-32 of `s` after ASCII-lowercasing, the way JAM hashes recipient
/// names (`.jdx`) and user handles (`.jlr`).
pub fn crc32_lowercase(s: &str) -> u32 {
    crc32(s.to_ascii_lowercase().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_hash_is_case_insensitive() {
        assert_eq!(crc32_lowercase("Bob"), crc32_lowercase("bob"));
        assert_eq!(crc32_lowercase("BOB"), crc32_lowercase("bob"));
    }
}
