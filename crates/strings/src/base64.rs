//! `encode_base64`/`decode_base64` are runtime-surface operators, always
//! unfoldable, but the codec itself is still a pure string function a
//! driver needs when it actually executes one. Kept here rather than
//! hand-rolled, backed by the `base64` crate.

use crate::bytestring::ByteString;
use crate::errors::StringError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode_base64(bytes: &ByteString) -> ByteString {
    ByteString::new(STANDARD.encode(bytes.as_bytes()).into_bytes())
}

pub fn decode_base64(bytes: &ByteString) -> Result<ByteString, StringError> {
    let text = std::str::from_utf8(bytes.as_bytes())
        .map_err(|e| StringError::ConversionFormat { kind: "base64", ch: '\u{FFFD}', pos: e.valid_up_to() })?;
    STANDARD
        .decode(text)
        .map(ByteString::new)
        .map_err(|e| StringError::DomainValue(format!("invalid base64 input: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_base64() {
        let original = ByteString::from_slice(b"hello world");
        let encoded = encode_base64(&original);
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded.as_bytes(), original.as_bytes());
    }
}
