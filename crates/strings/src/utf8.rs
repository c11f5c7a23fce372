//! UTF-8 codec and byte-order-mark detection for octet strings.
//!
//! `encode_to_utf8`/`decode_utf8` use the original 1..6-octet ISO-10646
//! table, not the narrower RFC 3629 (4-octet max) encoding: a `Quadruple`
//! outside the BMP/SMP range needs the 5- or 6-octet form, which `char`-based
//! standard library UTF-8 support doesn't cover.

use crate::bytestring::ByteString;
use crate::ustring::{Quadruple, UString};

/// One malformed position found while decoding; decoding never aborts, it
/// substitutes `Quadruple::new(0,0,0,0)` and keeps going so later stages can
/// still report every offending position in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utf8Diagnostic {
    pub octet_pos: usize,
    pub char_index: usize,
    pub message: String,
}

pub fn decode_utf8(bytes: &ByteString) -> (UString, Vec<Utf8Diagnostic>) {
    let input = bytes.as_bytes();
    let mut quads = Vec::new();
    let mut diags = Vec::new();
    let mut pos = 0;
    let mut char_index = 0;

    while pos < input.len() {
        let lead = input[pos];
        let (len, min_cp, init) = if lead < 0x80 {
            (1, 0, lead as u32)
        } else if lead & 0xE0 == 0xC0 {
            (2, 0x80, (lead & 0x1F) as u32)
        } else if lead & 0xF0 == 0xE0 {
            (3, 0x800, (lead & 0x0F) as u32)
        } else if lead & 0xF8 == 0xF0 {
            (4, 0x10000, (lead & 0x07) as u32)
        } else if lead & 0xFC == 0xF8 {
            (5, 0x200000, (lead & 0x03) as u32)
        } else if lead & 0xFE == 0xFC {
            (6, 0x4000000, (lead & 0x01) as u32)
        } else {
            diags.push(Utf8Diagnostic {
                octet_pos: pos,
                char_index,
                message: format!("invalid UTF-8 lead byte 0x{lead:02X}"),
            });
            quads.push(Quadruple::new(0, 0, 0, 0));
            pos += 1;
            char_index += 1;
            continue;
        };

        if pos + len > input.len() {
            diags.push(Utf8Diagnostic {
                octet_pos: pos,
                char_index,
                message: "truncated UTF-8 sequence at end of input".into(),
            });
            quads.push(Quadruple::new(0, 0, 0, 0));
            pos += 1;
            char_index += 1;
            continue;
        }

        let mut cp = init;
        let mut malformed = false;
        for k in 1..len {
            let cont = input[pos + k];
            if cont & 0xC0 != 0x80 {
                diags.push(Utf8Diagnostic {
                    octet_pos: pos + k,
                    char_index,
                    message: format!("invalid UTF-8 continuation byte 0x{cont:02X}"),
                });
                malformed = true;
                break;
            }
            cp = (cp << 6) | (cont & 0x3F) as u32;
        }

        if malformed {
            quads.push(Quadruple::new(0, 0, 0, 0));
            pos += 1;
            char_index += 1;
            continue;
        }

        if cp < min_cp {
            diags.push(Utf8Diagnostic {
                octet_pos: pos,
                char_index,
                message: format!("overlong UTF-8 encoding of U+{cp:04X}"),
            });
            quads.push(Quadruple::new(0, 0, 0, 0));
        } else {
            quads.push(Quadruple::from_code_point(cp));
        }
        pos += len;
        char_index += 1;
    }

    (UString::new(quads), diags)
}

/// Encodes using 5/6-octet forms only when `group`/`plane` is non-zero,
/// matching the original table instead of clamping to RFC 3629's 4-octet max.
pub fn encode_to_utf8(s: &UString) -> ByteString {
    let mut out = Vec::with_capacity(s.len());
    for q in s.quads() {
        let cp = q.code_point();
        if cp < 0x80 {
            out.push(cp as u8);
        } else if cp < 0x800 {
            out.push(0xC0 | (cp >> 6) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        } else if cp < 0x10000 {
            out.push(0xE0 | (cp >> 12) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        } else if cp < 0x200000 {
            out.push(0xF0 | (cp >> 18) as u8);
            out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        } else if cp < 0x4000000 {
            out.push(0xF8 | (cp >> 24) as u8);
            out.push(0x80 | ((cp >> 18) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        } else {
            out.push(0xFC | (cp >> 30) as u8);
            out.push(0x80 | ((cp >> 24) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 18) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        }
    }
    ByteString::new(out)
}

const BOM_UTF32_BE: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
const BOM_UTF32_LE: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// BOM-priority detection: 4-octet UTF-32 BOMs are checked before the
/// 2-octet UTF-16 BOMs they would otherwise prefix-match (`UTF-16LE`'s BOM
/// is a strict prefix of `UTF-32LE`'s).
pub fn get_string_encoding(bytes: &ByteString) -> &'static str {
    let b = bytes.as_bytes();
    if b.starts_with(&BOM_UTF32_BE) {
        "UTF-32BE"
    } else if b.starts_with(&BOM_UTF32_LE) {
        "UTF-32LE"
    } else if b.starts_with(&BOM_UTF16_BE) {
        "UTF-16BE"
    } else if b.starts_with(&BOM_UTF16_LE) {
        "UTF-16LE"
    } else if b.starts_with(&BOM_UTF8) {
        "UTF-8"
    } else if b.iter().all(|&o| o <= 127) {
        "ASCII"
    } else {
        "<unknown>"
    }
}

pub fn remove_bom(bytes: &ByteString) -> ByteString {
    let b = bytes.as_bytes();
    let prefix_len = if b.starts_with(&BOM_UTF32_BE) || b.starts_with(&BOM_UTF32_LE) {
        4
    } else if b.starts_with(&BOM_UTF16_BE) || b.starts_with(&BOM_UTF16_LE) {
        2
    } else if b.starts_with(&BOM_UTF8) {
        3
    } else {
        0
    };
    ByteString::from_slice(&b[prefix_len..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_roundtrips_through_utf8() {
        let s = UString::from_char_codes(&[72, 105]);
        let encoded = encode_to_utf8(&s);
        assert_eq!(encoded.as_bytes(), b"Hi");
        let (decoded, diags) = decode_utf8(&encoded);
        assert!(diags.is_empty());
        assert_eq!(decoded, s);
    }

    #[test]
    fn non_bmp_code_point_roundtrips() {
        let s = UString::from_char_codes(&[0x1F600]);
        let encoded = encode_to_utf8(&s);
        let (decoded, diags) = decode_utf8(&encoded);
        assert!(diags.is_empty());
        assert_eq!(decoded, s);
    }

    #[test]
    fn malformed_continuation_is_reported_and_substituted() {
        let bad = ByteString::from_slice(&[0xC2, 0x20]);
        let (decoded, diags) = decode_utf8(&bad);
        assert_eq!(diags.len(), 1);
        assert_eq!(decoded.quads()[0], Quadruple::new(0, 0, 0, 0));
    }

    #[test]
    fn utf32_bom_takes_priority_over_utf16_prefix_match() {
        let bytes = ByteString::from_slice(&BOM_UTF32_LE);
        assert_eq!(get_string_encoding(&bytes), "UTF-32LE");
    }

    #[test]
    fn all_ascii_without_bom_is_ascii() {
        let bytes = ByteString::from_slice(b"hello");
        assert_eq!(get_string_encoding(&bytes), "ASCII");
    }

    #[test]
    fn remove_bom_strips_detected_prefix() {
        let mut v = BOM_UTF8.to_vec();
        v.extend_from_slice(b"hi");
        let bytes = ByteString::from_slice(&v);
        assert_eq!(remove_bom(&bytes).as_bytes(), b"hi");
    }
}
