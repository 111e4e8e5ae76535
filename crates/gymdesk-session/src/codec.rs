//! Bearer token decoding
//!
//! Decodes the payload segment of a JWT-shaped token into [`Claims`]. The
//! signature is NOT verified: the issuing backend verifies it on every
//! request, and claims are only used client-side for display and for gating
//! navigation, never for authorization.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use gymdesk_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Staff role carried in the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Owner,
    Coach,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "owner" => Role::Owner,
            "coach" => Role::Coach,
            _ => Role::Other(raw.to_string()),
        }
    }
}

/// Decoded, unverified token claims
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Claims {
    /// Name to greet the user with: name, else email, else subject
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.subject)
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::parse)
    }

    /// True iff the token carries an expiry and it is at or before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<f64>,
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedToken(msg.into())
}

/// Decode a bearer token into claims without verifying its signature
pub fn decode(token: &str) -> Result<Claims> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let payload = parts[1].trim_end_matches('=');
    if payload.is_empty() {
        return Err(malformed("empty payload segment"));
    }

    let payload_bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| malformed(format!("payload is not base64url: {}", e)))?;

    let raw: RawClaims = serde_json::from_slice(&payload_bytes)
        .map_err(|e| malformed(format!("payload is not a JSON claims object: {}", e)))?;

    let subject = match raw.sub {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(malformed("'sub' claim must be a string or number")),
        None => return Err(malformed("missing 'sub' claim")),
    };

    let expires_at = match raw.exp {
        Some(secs) => Some(numeric_date(secs)?),
        None => None,
    };

    Ok(Claims {
        subject,
        display_name: raw.name,
        email: raw.email,
        role: raw.role,
        expires_at,
    })
}

/// Convert a NumericDate (seconds, possibly fractional) to an instant
fn numeric_date(secs: f64) -> Result<DateTime<Utc>> {
    if !secs.is_finite() {
        return Err(malformed("'exp' claim is not a finite number"));
    }
    let millis = (secs * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| malformed(format!("'exp' claim out of range: {}", secs)))
}

/// Build an unsigned token carrying `payload`, for fixtures and tests
#[cfg(any(test, feature = "test-util"))]
pub fn mint_unsigned(payload: &Value) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = BASE64_URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, body)
}

/// Fractional NumericDate for an instant, for fixtures and tests
#[cfg(any(test, feature = "test-util"))]
pub fn numeric_date_of(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_decode_full_claims() {
        let token = mint_unsigned(&json!({
            "sub": "user-1",
            "name": "Owner",
            "email": "owner@example.com",
            "role": "owner",
            "exp": 1_900_000_000
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.subject, "user-1");
        assert_eq!(claims.display_label(), "Owner");
        assert_eq!(claims.role(), Some(Role::Owner));
        assert_eq!(claims.expires_at.unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_fractional_exp_keeps_millis() {
        let exp = Utc::now() + Duration::milliseconds(50);
        let token = mint_unsigned(&json!({"sub": "u", "exp": numeric_date_of(exp)}));

        let claims = decode(&token).unwrap();
        assert_eq!(
            claims.expires_at.unwrap().timestamp_millis(),
            exp.timestamp_millis()
        );
    }

    #[test]
    fn test_decode_numeric_subject_and_no_exp() {
        let token = mint_unsigned(&json!({"sub": 42, "role": "coach"}));
        let claims = decode(&token).unwrap();

        assert_eq!(claims.subject, "42");
        assert_eq!(claims.expires_at, None);
        assert_eq!(claims.role(), Some(Role::Coach));
        assert!(!claims.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_display_label_fallbacks() {
        let token = mint_unsigned(&json!({"sub": "u-9", "email": "coach@example.com"}));
        assert_eq!(decode(&token).unwrap().display_label(), "coach@example.com");

        let token = mint_unsigned(&json!({"sub": "u-9"}));
        assert_eq!(decode(&token).unwrap().display_label(), "u-9");
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let body = BASE64_URL_SAFE.encode(json!({"sub": "padded"}).to_string());
        let token = format!("aGVhZGVy.{}.sig", body);
        assert_eq!(decode(&token).unwrap().subject, "padded");
    }

    #[test]
    fn test_decode_malformed_tokens() {
        for token in ["", "a.b", "a.b.c.d", "header..sig", "header.!!!.sig"] {
            assert!(
                matches!(decode(token), Err(Error::MalformedToken(_))),
                "token {:?} should be malformed",
                token
            );
        }

        // Valid base64 but not JSON
        let token = format!("h.{}.s", BASE64_URL_SAFE_NO_PAD.encode("plain text"));
        assert!(matches!(decode(&token), Err(Error::MalformedToken(_))));

        // JSON without a subject
        let token = mint_unsigned(&json!({"role": "owner"}));
        assert!(matches!(decode(&token), Err(Error::MalformedToken(_))));

        // Empty subject
        let token = mint_unsigned(&json!({"sub": ""}));
        assert!(matches!(decode(&token), Err(Error::MalformedToken(_))));
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let claims = Claims {
            subject: "u".into(),
            display_name: None,
            email: None,
            role: None,
            expires_at: Some(now),
        };
        assert!(claims.is_expired_at(now));
        assert!(!claims.is_expired_at(now - Duration::milliseconds(1)));
    }

    #[test]
    fn test_role_parse_other() {
        assert_eq!(Role::parse("ADMIN"), Role::Other("ADMIN".to_string()));
    }
}
