use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::{Error, Result};

/// Standard alphabet; padding is written on encode and optional on decode
const TEXT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode UTF-8 text as padded standard Base64
pub fn encode_base64(text: &str) -> String {
    TEXT_ENGINE.encode(text.as_bytes())
}

/// Decode Base64 back to UTF-8 text.
///
/// ASCII whitespace in the input is ignored. Byte sequences that are not
/// UTF-8 come back as U+FFFD.
pub fn decode_base64(input: &str) -> Result<String> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = TEXT_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| Error::Base64Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode_base64("Tuneer"), "VHVuZWVy");
        assert_eq!(encode_base64("hi"), "aGk=");
        assert_eq!(encode_base64(""), "");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_base64("aGVsbG8gd29ybGQ=").unwrap(), "hello world");
        assert_eq!(decode_base64("aGVsbG8gd29ybGQ").unwrap(), "hello world");
        assert_eq!(decode_base64(" aGVs\nbG8= ").unwrap(), "hello");
    }

    #[test]
    fn test_decode_unicode() {
        let encoded = encode_base64("héllo wörld ✓");
        assert_eq!(decode_base64(&encoded).unwrap(), "héllo wörld ✓");
    }

    #[test]
    fn test_decode_invalid() {
        let err = decode_base64("***invalid***").unwrap_err();
        assert!(matches!(err, Error::Base64Decode(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_decode_non_utf8_is_replaced() {
        assert_eq!(decode_base64("/w==").unwrap(), "\u{FFFD}");
        assert_eq!(decode_base64("aGk/").unwrap(), "hi?");
        assert_eq!(decode_base64("aGn/").unwrap(), "hi\u{FFFD}");
    }
}
