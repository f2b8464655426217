// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification of mini-app launch payloads ("init data").
//!
//! The client forwards the URL-encoded payload the platform handed it. The
//! payload carries a `hash` field: hex HMAC-SHA256 over the check-string,
//! keyed with `HMAC-SHA256(key = "WebAppData", data = bot_token)`.
//!
//! The check-string is every other field as `key=value`, sorted by key and
//! joined with `\n`. Values are compared after form-URL decoding.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AuthError;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Label keyed against the bot token to derive the signing key.
const KEY_DERIVATION_LABEL: &[u8] = b"WebAppData";

const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Places a caller identity may be found in a payload, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// JSON object in the named field whose `id` is the identity.
    UserObject(&'static str),
    /// Plain field holding the identity.
    Flat(&'static str),
}

/// Strategies used unless overridden: nested `user.id`, then flat `id`.
pub const DEFAULT_IDENTITY_SOURCES: &[IdentitySource] =
    &[IdentitySource::UserObject("user"), IdentitySource::Flat("id")];

impl IdentitySource {
    fn extract(&self, fields: &[(String, String)]) -> Option<String> {
        match self {
            IdentitySource::UserObject(name) => {
                let raw = field(fields, name)?;
                let user: serde_json::Value = serde_json::from_str(raw).ok()?;
                json_id(user.get("id")?)
            }
            IdentitySource::Flat(name) => {
                let raw = field(fields, name)?.trim();
                (!raw.is_empty()).then(|| raw.to_string())
            }
        }
    }
}

fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Verifies signed payloads against a bot credential.
///
/// Holds only the derived signing key; the bot token itself is not retained.
#[derive(Clone)]
pub struct PayloadVerifier {
    signing_key: [u8; 32],
    max_age_secs: Option<u64>,
    sources: &'static [IdentitySource],
}

impl std::fmt::Debug for PayloadVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadVerifier")
            .field("max_age_secs", &self.max_age_secs)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl PayloadVerifier {
    pub fn new(bot_token: &str) -> Self {
        Self {
            signing_key: derive_signing_key(bot_token),
            max_age_secs: None,
            sources: DEFAULT_IDENTITY_SOURCES,
        }
    }

    /// Reject payloads whose `auth_date` is more than `secs` old.
    pub fn with_max_age(mut self, secs: Option<u64>) -> Self {
        self.max_age_secs = secs;
        self
    }

    pub fn with_identity_sources(mut self, sources: &'static [IdentitySource]) -> Self {
        self.sources = sources;
        self
    }

    /// Verify `payload` and return the caller's identity.
    pub fn verify(&self, payload: &str) -> Result<String, AuthError> {
        self.verify_at(payload, chrono::Utc::now().timestamp())
    }

    /// Verify `payload` as of the Unix time `now`.
    pub fn verify_at(&self, payload: &str, now: i64) -> Result<String, AuthError> {
        let mut fields = parse_fields(payload)?;

        let hash_idx = fields
            .iter()
            .position(|(k, _)| k == HASH_FIELD)
            .ok_or_else(|| AuthError::Malformed("missing hash field".to_string()))?;
        let (_, supplied_hash) = fields.remove(hash_idx);

        let check_string = check_string(&fields);
        let expected = sign(&self.signing_key, &check_string);

        // Compared as lowercase hex text, byte for byte
        let expected = hex::encode(expected);
        let valid = supplied_hash.len() == expected.len()
            && bool::from(supplied_hash.as_bytes().ct_eq(expected.as_bytes()));
        if !valid {
            tracing::warn!("Payload signature mismatch");
            return Err(AuthError::InvalidSignature);
        }

        if let Some(max_age) = self.max_age_secs {
            let auth_date: i64 = field(&fields, AUTH_DATE_FIELD)
                .and_then(|v| v.parse().ok())
                .ok_or(AuthError::Expired)?;
            if now.saturating_sub(auth_date) > max_age as i64 {
                return Err(AuthError::Expired);
            }
        }

        self.sources
            .iter()
            .find_map(|source| source.extract(&fields))
            .ok_or(AuthError::NoIdentity)
    }
}

/// Signing key: `HMAC-SHA256(key = "WebAppData", data = bot_token)`.
pub fn derive_signing_key(bot_token: &str) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(KEY_DERIVATION_LABEL).expect("HMAC accepts keys of any size");
    mac.update(bot_token.as_bytes());
    mac.finalize().into_bytes().into()
}

fn sign(key: &[u8], check_string: &str) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(check_string.as_bytes());
    mac.finalize().into_bytes().into()
}

/// Decode one form-urlencoded component (`+` is a space).
fn form_decode(raw: &str) -> Result<String, AuthError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|_| AuthError::Malformed("invalid percent-encoding".to_string()))
}

/// Split a payload into decoded `(key, value)` pairs, preserving order.
pub fn parse_fields(payload: &str) -> Result<Vec<(String, String)>, AuthError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(AuthError::Malformed("empty payload".to_string()));
    }

    let mut fields: Vec<(String, String)> = Vec::new();
    for pair in payload.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = form_decode(key)?;
        let value = form_decode(value)?;

        if key.is_empty() {
            return Err(AuthError::Malformed("empty field name".to_string()));
        }
        if fields.iter().any(|(k, _)| *k == key) {
            return Err(AuthError::Malformed(format!("duplicate field {:?}", key)));
        }
        fields.push((key, value));
    }

    Ok(fields)
}

/// Canonical `key=value` lines sorted by key, joined with `\n`.
pub fn check_string(fields: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build a signed payload for `fields`. Used by tests and tooling that
/// impersonate the platform.
pub fn sign_payload(bot_token: &str, fields: &[(&str, &str)]) -> String {
    let owned: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = hex::encode(sign(&derive_signing_key(bot_token), &check_string(&owned)));

    let mut encoded: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    encoded.push(format!("{}={}", HASH_FIELD, hash));
    encoded.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:TEST-bot-token";

    fn user_payload() -> String {
        sign_payload(
            TOKEN,
            &[
                ("query_id", "AAH-abc"),
                ("user", r#"{"id":777,"first_name":"Ann","username":"ann"}"#),
                ("auth_date", "1700000000"),
            ],
        )
    }

    #[test]
    fn test_verify_valid_payload() {
        let verifier = PayloadVerifier::new(TOKEN);
        assert_eq!(verifier.verify(&user_payload()), Ok("777".to_string()));
    }

    #[test]
    fn test_check_string_sorted_by_key() {
        let fields = vec![
            ("user".to_string(), "{}".to_string()),
            ("auth_date".to_string(), "1".to_string()),
            ("query_id".to_string(), "q".to_string()),
        ];
        assert_eq!(check_string(&fields), "auth_date=1\nquery_id=q\nuser={}");
    }

    #[test]
    fn test_missing_hash_is_malformed() {
        let verifier = PayloadVerifier::new(TOKEN);
        let result = verifier.verify("auth_date=1&user=%7B%22id%22%3A1%7D");
        assert!(matches!(result, Err(AuthError::Malformed(_))));
    }

    #[test]
    fn test_empty_payload_is_malformed() {
        let verifier = PayloadVerifier::new(TOKEN);
        assert!(matches!(verifier.verify(""), Err(AuthError::Malformed(_))));
        assert!(matches!(verifier.verify("   "), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn test_bad_percent_encoding_is_malformed() {
        let verifier = PayloadVerifier::new(TOKEN);
        let result = verifier.verify("user=%FF%FE&hash=00");
        assert!(matches!(result, Err(AuthError::Malformed(_))));
    }

    #[test]
    fn test_wrong_token_is_invalid_signature() {
        let verifier = PayloadVerifier::new("999:other-token");
        assert_eq!(
            verifier.verify(&user_payload()),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_non_hex_hash_is_invalid_signature() {
        let verifier = PayloadVerifier::new(TOKEN);
        let result = verifier.verify("auth_date=1&hash=not-hex");
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_flat_id_fallback() {
        let verifier = PayloadVerifier::new(TOKEN);
        let payload = sign_payload(TOKEN, &[("auth_date", "1"), ("id", "31337")]);
        assert_eq!(verifier.verify(&payload), Ok("31337".to_string()));
    }

    #[test]
    fn test_unparseable_user_falls_back_to_flat_id() {
        let verifier = PayloadVerifier::new(TOKEN);
        let payload = sign_payload(TOKEN, &[("user", "not json"), ("id", "5")]);
        assert_eq!(verifier.verify(&payload), Ok("5".to_string()));
    }

    #[test]
    fn test_no_identity() {
        let verifier = PayloadVerifier::new(TOKEN);
        let payload = sign_payload(TOKEN, &[("auth_date", "1"), ("user", r#"{"name":"x"}"#)]);
        assert_eq!(verifier.verify(&payload), Err(AuthError::NoIdentity));
    }

    #[test]
    fn test_max_age() {
        let verifier = PayloadVerifier::new(TOKEN).with_max_age(Some(3600));
        let payload = user_payload();

        assert_eq!(
            verifier.verify_at(&payload, 1_700_000_000 + 60),
            Ok("777".to_string())
        );
        assert_eq!(
            verifier.verify_at(&payload, 1_700_000_000 + 3601),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_duplicate_field_is_malformed() {
        let verifier = PayloadVerifier::new(TOKEN);
        let result = verifier.verify("id=1&id=2&hash=00");
        assert!(matches!(result, Err(AuthError::Malformed(_))));
    }

    #[test]
    fn test_check_string_sorts_by_key_not_line() {
        // "a!" sorts before "a=" as a line but after "a" as a key
        let fields = vec![
            ("a!".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ];
        assert_eq!(check_string(&fields), "a=1\na!=2");
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let fields = parse_fields("a=hello+world&b=x%2By").unwrap();
        assert_eq!(fields[0].1, "hello world");
        assert_eq!(fields[1].1, "x+y");
    }

    #[test]
    fn test_debug_hides_key() {
        let verifier = PayloadVerifier::new(TOKEN);
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains("signing_key"));
    }
}
