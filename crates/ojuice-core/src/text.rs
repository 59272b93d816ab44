//! Name-buffer text decoding.

use encoding_rs::SHIFT_JIS;
use tracing::debug;

/// Decodes a raw name buffer read from game memory.
///
/// The buffer is truncated at the first null byte, decoded as UTF-8 when
/// possible and as Shift-JIS with lossy replacement otherwise, and trimmed
/// of surrounding whitespace.
pub fn decode_name(raw: &[u8]) -> String {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let bytes = &raw[..len];

    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim().to_string(),
        Err(_) => {
            debug!(
                "Name buffer is not valid UTF-8, decoding {} bytes as Shift-JIS",
                bytes.len()
            );
            let (decoded, _, _) = SHIFT_JIS.decode(bytes);
            decoded.trim().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_at_null() {
        assert_eq!(decode_name(b"Ali\x00garbage"), "Ali");
    }

    #[test]
    fn test_no_null_terminator() {
        assert_eq!(decode_name(b"Marie"), "Marie");
    }

    #[test]
    fn test_shift_jis_fallback() {
        // "テスト" in Shift-JIS, not valid UTF-8
        let data = [0x83, 0x65, 0x83, 0x58, 0x83, 0x67, 0x00];
        assert_eq!(decode_name(&data), "テスト");
    }

    #[test]
    fn test_invalid_bytes_do_not_panic() {
        // Lone lead byte is invalid in both charsets; lossy replacement kicks in
        let data = [0x83, 0x00];
        let decoded = decode_name(&data);
        assert!(!decoded.contains('\u{0}'));
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(decode_name(b"  Suguri  \x00"), "Suguri");
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(decode_name(b""), "");
        assert_eq!(decode_name(b"\x00name"), "");
    }
}
