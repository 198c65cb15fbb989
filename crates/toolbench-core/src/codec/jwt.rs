//! Inspect, sign and verify JSON Web Tokens (`HS256` and unsigned).

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use ring::hmac;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// URL-safe alphabet, no padding written, padding tolerated on read
const URL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Supported signing algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JwtAlgorithm {
    #[default]
    Hs256,
    None,
}

impl JwtAlgorithm {
    /// The `alg` header value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::None => "none",
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HS256" | "hs256" => Ok(Self::Hs256),
            "none" => Ok(Self::None),
            other => Err(format!("unsupported algorithm '{other}' (expected HS256 or none)")),
        }
    }
}

/// Outcome of checking a token's signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    /// Not checked: no signature, no secret, or an unsigned algorithm
    Unknown,
    Valid,
    Invalid,
}

impl fmt::Display for SignatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "Signature not verified",
            Self::Valid => "Signature verified",
            Self::Invalid => "Signature invalid",
        };
        f.write_str(label)
    }
}

/// The readable parts of a token
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub payload: Value,
    /// Raw base64url signature, if present
    pub signature: Option<String>,
    signing_input: String,
}

impl DecodedToken {
    /// `alg` from the header, when it names a supported algorithm
    pub fn header_algorithm(&self) -> Option<JwtAlgorithm> {
        self.header
            .get("alg")
            .and_then(Value::as_str)
            .and_then(|alg| match alg {
                "HS256" => Some(JwtAlgorithm::Hs256),
                "none" => Some(JwtAlgorithm::None),
                _ => None,
            })
    }

    /// Length of the decoded signature in bytes
    pub fn signature_len(&self) -> Option<usize> {
        self.signature
            .as_deref()
            .and_then(|sig| URL_ENGINE.decode(sig).ok())
            .map(|bytes| bytes.len())
    }
}

/// A decoded token plus the verdict on its signature
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInspection {
    pub token: DecodedToken,
    /// Algorithm used for verification
    pub algorithm: JwtAlgorithm,
    pub signature: SignatureState,
}

/// Split a token into its parts and decode header and payload.
pub fn decode_token(token: &str) -> Result<DecodedToken> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(Error::JwtMalformed("Enter a JWT to decode.".to_string()));
    }

    let mut parts = trimmed.split('.').filter(|part| !part.is_empty());
    let (Some(header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(Error::JwtMalformed(
            "JWT must contain header and payload segments.".to_string(),
        ));
    };
    let signature = parts.next().map(str::to_string);

    let header_json = decode_json_segment(header)
        .ok_or_else(|| Error::JwtJson("Invalid header segment. Could not parse JSON.".to_string()))?;
    let payload_json = decode_json_segment(payload).ok_or_else(|| {
        Error::JwtJson("Invalid payload segment. Could not parse JSON.".to_string())
    })?;

    Ok(DecodedToken {
        header: header_json,
        payload: payload_json,
        signature,
        signing_input: format!("{header}.{payload}"),
    })
}

/// Decode a token and verify its signature when there is enough to do so.
///
/// A supported `alg` in the header overrides `algorithm`.
pub fn inspect_token(token: &str, algorithm: JwtAlgorithm, secret: &str) -> Result<TokenInspection> {
    let token = decode_token(token)?;
    let algorithm = token.header_algorithm().unwrap_or(algorithm);

    let signature = match (&token.signature, algorithm) {
        (Some(signature), JwtAlgorithm::Hs256) if !secret.trim().is_empty() => {
            if verify_hs256(secret, &token.signing_input, signature) {
                SignatureState::Valid
            } else {
                SignatureState::Invalid
            }
        }
        _ => SignatureState::Unknown,
    };

    Ok(TokenInspection {
        token,
        algorithm,
        signature,
    })
}

/// Build a token from header and payload JSON text.
///
/// `typ` defaults to `JWT` and `alg` is always set to `algorithm`.
pub fn sign_token(
    header_json: &str,
    payload_json: &str,
    algorithm: JwtAlgorithm,
    secret: &str,
) -> Result<String> {
    let invalid = || Error::JwtJson("Header and payload must be valid JSON.".to_string());
    let header: Value = serde_json::from_str(header_json).map_err(|_| invalid())?;
    let payload: Value = serde_json::from_str(payload_json).map_err(|_| invalid())?;

    let Value::Object(fields) = header else {
        return Err(Error::JwtJson("Header must be a JSON object.".to_string()));
    };

    let mut prepared = Map::new();
    prepared.insert("typ".to_string(), Value::from("JWT"));
    prepared.extend(fields);
    prepared.insert("alg".to_string(), Value::from(algorithm.as_str()));

    let signing_input = format!(
        "{}.{}",
        encode_json_segment(&Value::Object(prepared))?,
        encode_json_segment(&payload)?
    );

    match algorithm {
        JwtAlgorithm::None => Ok(signing_input),
        JwtAlgorithm::Hs256 => {
            if secret.trim().is_empty() {
                return Err(Error::JwtMissingSecret);
            }
            let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
            let tag = hmac::sign(&key, signing_input.as_bytes());
            Ok(format!("{signing_input}.{}", URL_ENGINE.encode(tag.as_ref())))
        }
    }
}

fn verify_hs256(secret: &str, signing_input: &str, signature: &str) -> bool {
    let Ok(signature) = URL_ENGINE.decode(signature) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, signing_input.as_bytes(), &signature).is_ok()
}

fn decode_json_segment(segment: &str) -> Option<Value> {
    let bytes = URL_ENGINE.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn encode_json_segment(value: &Value) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| Error::JwtJson(e.to_string()))?;
    Ok(URL_ENGINE.encode(json))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
        eyJzdWIiOiIxMjM0NTY3ODkwIiwibmFtZSI6IkpvaG4gRG9lIiwiaWF0IjoxNTE2MjM5MDIyfQ.\
        SflKxwRJSMeKKF2QT4fwpMeJf36POk6yJV_adQssw5c";
    const SAMPLE_SECRET: &str = "your-256-bit-secret";

    #[test]
    fn test_decode_sample() {
        let token = decode_token(SAMPLE).unwrap();
        assert_eq!(token.header["alg"], "HS256");
        assert_eq!(token.payload["name"], "John Doe");
        assert_eq!(token.header_algorithm(), Some(JwtAlgorithm::Hs256));
        assert_eq!(token.signature_len(), Some(32));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_token("  "), Err(Error::JwtMalformed(_))));
        assert!(matches!(decode_token("abc"), Err(Error::JwtMalformed(_))));
        assert!(matches!(decode_token("abc.."), Err(Error::JwtMalformed(_))));

        let err = decode_token("bm90IGpzb24.e30").unwrap_err();
        assert!(err.to_string().contains("header"));
        let err = decode_token("e30.bm90IGpzb24").unwrap_err();
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_inspect_verifies_signature() {
        let valid = inspect_token(SAMPLE, JwtAlgorithm::None, SAMPLE_SECRET).unwrap();
        assert_eq!(valid.algorithm, JwtAlgorithm::Hs256);
        assert_eq!(valid.signature, SignatureState::Valid);

        let invalid = inspect_token(SAMPLE, JwtAlgorithm::Hs256, "wrong").unwrap();
        assert_eq!(invalid.signature, SignatureState::Invalid);

        let unchecked = inspect_token(SAMPLE, JwtAlgorithm::Hs256, "   ").unwrap();
        assert_eq!(unchecked.signature, SignatureState::Unknown);
    }

    #[test]
    fn test_sign_then_inspect() {
        let token = sign_token(
            r#"{"kid": "k1"}"#,
            r#"{"sub": "42"}"#,
            JwtAlgorithm::Hs256,
            "s3cret",
        )
        .unwrap();
        assert_eq!(token.split('.').count(), 3);

        let inspection = inspect_token(&token, JwtAlgorithm::None, "s3cret").unwrap();
        assert_eq!(inspection.signature, SignatureState::Valid);
        assert_eq!(inspection.token.header["typ"], "JWT");
        assert_eq!(inspection.token.header["kid"], "k1");
        assert_eq!(inspection.token.payload["sub"], "42");
    }

    #[test]
    fn test_sign_overrides_alg() {
        let token = sign_token(r#"{"alg": "RS512"}"#, "{}", JwtAlgorithm::None, "").unwrap();
        assert_eq!(token.split('.').count(), 2);

        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded.header["alg"], "none");
        assert!(decoded.signature.is_none());
    }

    #[test]
    fn test_sign_errors() {
        assert!(matches!(
            sign_token("[1]", "{}", JwtAlgorithm::None, ""),
            Err(Error::JwtJson(msg)) if msg == "Header must be a JSON object."
        ));
        assert!(matches!(
            sign_token("{", "{}", JwtAlgorithm::None, ""),
            Err(Error::JwtJson(_))
        ));
        assert!(matches!(
            sign_token("{}", "{}", JwtAlgorithm::Hs256, " "),
            Err(Error::JwtMissingSecret)
        ));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("HS256".parse::<JwtAlgorithm>().unwrap(), JwtAlgorithm::Hs256);
        assert_eq!("none".parse::<JwtAlgorithm>().unwrap(), JwtAlgorithm::None);
        assert!("RS256".parse::<JwtAlgorithm>().is_err());
    }
}
