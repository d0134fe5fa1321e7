//! Strict UTF-8 decoding for PAX records.
//!
//! The decoder emits UTF-16 code units: anything above U+FFFF becomes a
//! surrogate pair. There is no replacement-character fallback; a call either
//! decodes the whole input or fails.

use crate::error::{Error, Result};

/// Decodes `bytes` into UTF-16 code units.
pub fn decode_utf16(bytes: &[u8]) -> Result<Vec<u16>> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        let (continuation, initial) = match lead {
            0x00..=0x7F => (0, u32::from(lead)),
            0xC0..=0xDF => (1, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (2, u32::from(lead & 0x0F)),
            0xF0..=0xF7 => (3, u32::from(lead & 0x07)),
            _ => {
                return Err(Error::Decode(format!(
                    "unknown multibyte start 0x{:x} at index {}",
                    lead, i
                )));
            }
        };
        if i + continuation >= bytes.len() {
            return Err(Error::Decode(format!(
                "incomplete {}-byte sequence",
                continuation + 1
            )));
        }
        let code_point = bytes[i + 1..i + 1 + continuation]
            .iter()
            .fold(initial, |acc, &b| (acc << 6) | u32::from(b & 0x3F));
        i += continuation + 1;

        if code_point <= 0xFFFF {
            units.push(code_point as u16);
        } else if code_point <= 0x10FFFF {
            let offset = code_point - 0x10000;
            units.push(0xD800 | (offset >> 10) as u16);
            units.push(0xDC00 | (offset & 0x3FF) as u16);
        } else {
            return Err(Error::Decode(format!(
                "code point 0x{:x} exceeds UTF-16 reach",
                code_point
            )));
        }
    }
    Ok(units)
}

/// Decodes `bytes` into a Rust string.
///
/// Fails where [`decode_utf16`] does, and also when a 3-byte sequence encodes
/// a lone surrogate that has no `char` representation.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let units = decode_utf16(bytes)?;
    String::from_utf16(&units).map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(decode(b"path=a.txt").unwrap(), "path=a.txt");
        assert_eq!(decode(b"").unwrap(), "");
    }

    #[test]
    fn multibyte_sequences() {
        // é, あ
        assert_eq!(decode(&[0xC3, 0xA9]).unwrap(), "\u{e9}");
        assert_eq!(decode(&[0xE3, 0x81, 0x82]).unwrap(), "\u{3042}");
    }

    #[test]
    fn astral_code_point_becomes_surrogate_pair() {
        let bytes = [0xF0, 0x9F, 0x98, 0x80];
        assert_eq!(decode_utf16(&bytes).unwrap(), vec![0xD83D, 0xDE00]);
        assert_eq!(decode(&bytes).unwrap(), "\u{1F600}");
    }

    #[test]
    fn missing_continuation_fails() {
        for bytes in [&[0xC3][..], &[0xE3, 0x81], &[0xF0, 0x9F, 0x98]] {
            let err = decode(bytes).unwrap_err();
            assert!(matches!(err, Error::Decode(ref m) if m.contains("incomplete")), "{err}");
        }
    }

    #[test]
    fn unknown_lead_byte_fails() {
        let err = decode(&[b'a', 0x80]).unwrap_err();
        assert!(matches!(err, Error::Decode(ref m) if m.contains("0x80 at index 1")));
        assert!(decode(&[0xF8, 0x80, 0x80, 0x80]).is_err());
    }

    #[test]
    fn out_of_range_code_point_fails() {
        // F7 BF BF BF would be U+1FFFFF
        let err = decode(&[0xF7, 0xBF, 0xBF, 0xBF]).unwrap_err();
        assert!(matches!(err, Error::Decode(ref m) if m.contains("exceeds")));
    }

    #[test]
    fn lone_surrogate_has_no_string_form() {
        let bytes = [0xED, 0xA0, 0x80];
        assert_eq!(decode_utf16(&bytes).unwrap(), vec![0xD800]);
        assert!(decode(&bytes).is_err());
    }
}
