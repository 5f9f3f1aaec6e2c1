//! UTF transcoding (spec §4.7, §6 `StreamOptions`): converting between raw
//! bytes in one of [`crate::options::UtfType`]'s five encodings and a Rust
//! `String` (always UTF-8 internally), with BOM detection/emission and a
//! policy-controlled substitution for invalid byte sequences.
//!
//! Grounded on the original's `convert_utf.h`, which substitutes a visible
//! placeholder glyph for invalid sequences under a non-throwing policy
//! rather than silently dropping them; this crate uses the same `☐`
//! (U+2610 BALLOT BOX) marker.

use crate::error::{Error, Result};
use crate::options::{Policy, UtfType};

/// The substitution character written in place of an invalid byte sequence
/// when [`Policy::Skip`] is in effect.
pub const REPLACEMENT_CHAR: char = '\u{2610}';

/// Returns the byte-order-mark sequence for `encoding`, if it has one.
/// (Plain UTF-8 has a BOM too, per the Unicode standard, though it's rarely
/// written.)
pub fn bom_bytes(encoding: UtfType) -> &'static [u8] {
    match encoding {
        UtfType::Utf8 => &[0xEF, 0xBB, 0xBF],
        UtfType::Utf16Le => &[0xFF, 0xFE],
        UtfType::Utf16Be => &[0xFE, 0xFF],
        UtfType::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
        UtfType::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
    }
}

/// Detects a BOM at the start of `bytes`, returning the encoding and the
/// BOM's length in bytes. Checked longest-prefix-first so a UTF-32LE BOM
/// (which extends a UTF-16LE BOM with two zero bytes) is not misread as
/// UTF-16LE.
pub fn detect_encoding(bytes: &[u8]) -> Option<(UtfType, usize)> {
    const CANDIDATES: &[UtfType] =
        &[UtfType::Utf32Le, UtfType::Utf32Be, UtfType::Utf16Le, UtfType::Utf16Be, UtfType::Utf8];
    CANDIDATES.iter().find_map(|&encoding| {
        let bom = bom_bytes(encoding);
        bytes.starts_with(bom).then_some((encoding, bom.len()))
    })
}

/// Decodes `bytes` (with any leading BOM already stripped by the caller)
/// from `encoding` into a `String`.
pub fn decode(bytes: &[u8], encoding: UtfType, policy: Policy) -> Result<String> {
    match encoding {
        UtfType::Utf8 => decode_utf8(bytes, policy),
        UtfType::Utf16Le => decode_utf16(bytes, policy, u16::from_le_bytes),
        UtfType::Utf16Be => decode_utf16(bytes, policy, u16::from_be_bytes),
        UtfType::Utf32Le => decode_utf32(bytes, policy, u32::from_le_bytes),
        UtfType::Utf32Be => decode_utf32(bytes, policy, u32::from_be_bytes),
    }
}

/// Encodes `text` into `encoding`'s bytes, optionally prefixed with a BOM.
pub fn encode(text: &str, encoding: UtfType, write_bom: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if write_bom {
        out.extend_from_slice(bom_bytes(encoding));
    }
    match encoding {
        UtfType::Utf8 => out.extend_from_slice(text.as_bytes()),
        UtfType::Utf16Le => {
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
        UtfType::Utf16Be => {
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
        UtfType::Utf32Le => {
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_le_bytes());
            }
        }
        UtfType::Utf32Be => {
            for ch in text.chars() {
                out.extend_from_slice(&(ch as u32).to_be_bytes());
            }
        }
    }
    out
}

fn decode_utf8(bytes: &[u8], policy: Policy) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) if policy.is_throw() => {
            Err(Error::UtfEncodingError { path: String::new(), message: "invalid UTF-8 byte sequence".to_string() })
        }
        Err(_) => {
            let mut out = String::new();
            let mut rest = bytes;
            loop {
                match std::str::from_utf8(rest) {
                    Ok(valid) => {
                        out.push_str(valid);
                        break;
                    }
                    Err(err) => {
                        let valid_len = err.valid_up_to();
                        out.push_str(std::str::from_utf8(&rest[..valid_len]).unwrap());
                        out.push(REPLACEMENT_CHAR);
                        let skip = err.error_len().unwrap_or(rest.len() - valid_len).max(1);
                        rest = &rest[valid_len + skip..];
                        if rest.is_empty() {
                            break;
                        }
                    }
                }
            }
            Ok(out)
        }
    }
}

fn decode_utf16(bytes: &[u8], policy: Policy, from_bytes: fn([u8; 2]) -> u16) -> Result<String> {
    let units: Vec<u16> = bytes.chunks(2).map(|chunk| {
        let mut buf = [0u8; 2];
        buf[..chunk.len()].copy_from_slice(chunk);
        from_bytes(buf)
    }).collect();

    let mut out = String::new();
    for result in char::decode_utf16(units) {
        match result {
            Ok(ch) => out.push(ch),
            Err(_) if policy.is_throw() => {
                return Err(Error::UtfEncodingError { path: String::new(), message: "invalid UTF-16 code unit sequence".to_string() });
            }
            Err(_) => out.push(REPLACEMENT_CHAR),
        }
    }
    Ok(out)
}

fn decode_utf32(bytes: &[u8], policy: Policy, from_bytes: fn([u8; 4]) -> u32) -> Result<String> {
    let mut out = String::new();
    for chunk in bytes.chunks(4) {
        if chunk.len() < 4 {
            if policy.is_throw() {
                return Err(Error::UtfEncodingError { path: String::new(), message: "truncated UTF-32 code unit".to_string() });
            }
            out.push(REPLACEMENT_CHAR);
            break;
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(chunk);
        let scalar = from_bytes(buf);
        match char::from_u32(scalar) {
            Some(ch) => out.push(ch),
            None if policy.is_throw() => {
                return Err(Error::UtfEncodingError { path: String::new(), message: format!("{scalar:#x} is not a valid Unicode scalar value") });
            }
            None => out.push(REPLACEMENT_CHAR),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_utf8() {
        let bytes = encode("héllo", UtfType::Utf8, false);
        assert_eq!(decode(&bytes, UtfType::Utf8, Policy::ThrowError).unwrap(), "héllo");
    }

    #[test]
    fn round_trips_utf16_both_endians() {
        let text = "héllo 世界";
        for encoding in [UtfType::Utf16Le, UtfType::Utf16Be] {
            let bytes = encode(text, encoding, false);
            assert_eq!(decode(&bytes, encoding, Policy::ThrowError).unwrap(), text);
        }
    }

    #[test]
    fn round_trips_utf32_both_endians() {
        let text = "héllo 世界";
        for encoding in [UtfType::Utf32Le, UtfType::Utf32Be] {
            let bytes = encode(text, encoding, false);
            assert_eq!(decode(&bytes, encoding, Policy::ThrowError).unwrap(), text);
        }
    }

    #[test]
    fn invalid_utf8_throws_under_throw_policy() {
        let bytes = vec![0xFF, 0xFE, 0xFD];
        assert!(decode(&bytes, UtfType::Utf8, Policy::ThrowError).is_err());
    }

    #[test]
    fn invalid_utf8_substitutes_under_skip_policy() {
        let bytes = vec![b'a', 0xFF, b'b'];
        let text = decode(&bytes, UtfType::Utf8, Policy::Skip).unwrap();
        assert_eq!(text, format!("a{REPLACEMENT_CHAR}b"));
    }

    #[test]
    fn detects_utf8_bom() {
        let mut bytes = bom_bytes(UtfType::Utf8).to_vec();
        bytes.extend_from_slice(b"hi");
        assert_eq!(detect_encoding(&bytes), Some((UtfType::Utf8, 3)));
    }

    #[test]
    fn detects_utf32le_bom_not_utf16le() {
        let bytes = bom_bytes(UtfType::Utf32Le).to_vec();
        assert_eq!(detect_encoding(&bytes), Some((UtfType::Utf32Le, 4)));
    }
}
