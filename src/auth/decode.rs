use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine};
use serde_json::Value;
use tracing::{debug, warn};

use super::{token_prefix, IdentityClaim, PLACEHOLDER_EMAIL};

/// Subject fields, first present wins.
const SUBJECT_FIELDS: &[&str] = &["user_id", "sub", "uid"];

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Reads the identity out of a token payload without checking its signature.
///
/// The token is split on `.`, the second segment decoded as base64 (URL-safe
/// or standard alphabet, padding optional) and parsed as a JSON object. The
/// subject comes from `user_id`, `sub` or `uid`; `email` defaults to a
/// placeholder. Returns `None` when any step fails.
pub fn decode_unverified(token: &str) -> Option<IdentityClaim> {
    let mut parts = token.split('.');
    let (_header, payload) = (parts.next()?, parts.next()?);

    let bytes = match decode_segment(payload) {
        Some(bytes) => bytes,
        None => {
            debug!("token {}...: payload is not base64", token_prefix(token));
            return None;
        }
    };

    let claims = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            debug!("token {}...: payload is not a JSON object", token_prefix(token));
            return None;
        }
    };

    let subject = SUBJECT_FIELDS
        .iter()
        .filter_map(|field| claims.get(*field))
        .find_map(non_empty_string);

    let Some(subject) = subject else {
        warn!("Could not extract user id from token payload");
        return None;
    };

    let email = claims
        .get("email")
        .and_then(non_empty_string)
        .unwrap_or_else(|| PLACEHOLDER_EMAIL.to_string());

    Some(IdentityClaim::unverified(subject, email))
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let segment = segment.trim();
    URL_SAFE_LENIENT
        .decode(segment)
        .or_else(|_| STANDARD_LENIENT.decode(segment))
        .ok()
}

fn non_empty_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds an unsigned token around `payload`; handy for fixtures.
pub fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ClaimSource;
    use base64::engine::general_purpose::STANDARD_NO_PAD;
    use serde_json::json;

    #[test]
    fn subject_priority_is_user_id_then_sub_then_uid() {
        let token = encode_unsigned(&json!({"uid": "c", "sub": "b", "user_id": "a"}));
        assert_eq!(decode_unverified(&token).unwrap().subject_id, "a");

        let token = encode_unsigned(&json!({"uid": "c", "sub": "b"}));
        assert_eq!(decode_unverified(&token).unwrap().subject_id, "b");

        let token = encode_unsigned(&json!({"uid": "c", "user_id": ""}));
        assert_eq!(decode_unverified(&token).unwrap().subject_id, "c");
    }

    #[test]
    fn email_defaults_to_placeholder() {
        let claim = decode_unverified(&encode_unsigned(&json!({"sub": "u123"}))).unwrap();
        assert_eq!(claim.email, PLACEHOLDER_EMAIL);
        assert_eq!(claim.source, ClaimSource::Unverified);

        let claim = decode_unverified(&encode_unsigned(&json!({"sub": "u1", "email": "a@b.c"}))).unwrap();
        assert_eq!(claim.email, "a@b.c");
    }

    #[test]
    fn accepts_padded_standard_alphabet() {
        let body = base64::engine::general_purpose::STANDARD.encode(r#"{"sub":"u1"}"#);
        let token = format!("x.{}.sig", body);
        assert_eq!(decode_unverified(&token).unwrap().subject_id, "u1");
        let token = format!("x.{}", STANDARD_NO_PAD.encode(r#"{"sub":"u2"}"#));
        assert_eq!(decode_unverified(&token).unwrap().subject_id, "u2");
    }

    #[test]
    fn garbage_yields_none() {
        assert!(decode_unverified("not-a-token").is_none());
        assert!(decode_unverified("a.!!!.c").is_none());
        assert!(decode_unverified(&format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"))).is_none());
        assert!(decode_unverified(&encode_unsigned(&json!({"email": "x@y.z"}))).is_none());
    }
}
