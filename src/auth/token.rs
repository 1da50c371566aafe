//! Signed, time-bound bearer tokens (compact JWS, HS256).
//!
//! A token is `base64url(header).base64url(claims).base64url(hmac)`. The
//! header is always `{"alg":"HS256","typ":"JWT"}` and the claims carry the
//! subject id (`sub`), the login (`username`), the token class (`type`), and
//! `iat`/`exp`/`jti`.
//!
//! Validation runs in a fixed order: structure, algorithm, signature, claims,
//! expiry, and finally the class check in [`TokenCodec::validate_as`].

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "HS256";
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("unexpected signing method: {0}")]
    WrongSigningMethod(String),
    #[error("missing or invalid claim: {0}")]
    MissingClaim(&'static str),
    #[error("wrong token class: expected {expected}, got {actual}")]
    WrongTokenClass {
        expected: TokenClass,
        actual: TokenClass,
    },
    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,
    #[error("failed to encode token")]
    Encoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "access" => Some(Self::Access),
            "refresh" => Some(Self::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub username: String,
    #[serde(rename = "type")]
    pub class: TokenClass,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Issues and validates tokens with one immutable HMAC key.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("alg", &SIGNING_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the process signing secret.
    ///
    /// # Errors
    /// Returns [`TokenError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_BYTES`].
    pub fn new(secret: &SecretString) -> Result<Self, TokenError> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret);
        }
        let mac = HmacSha256::new_from_slice(bytes).map_err(|_| TokenError::WeakSecret)?;
        Ok(Self { mac })
    }

    /// Issue a token that expires `ttl` from now.
    ///
    /// # Errors
    /// Returns [`TokenError::Encoding`] if the header or claims cannot be serialized.
    pub fn issue(
        &self,
        subject_id: Uuid,
        login: &str,
        class: TokenClass,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(subject_id, login, class, ttl, unix_now())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    /// Returns [`TokenError::Encoding`] if the header or claims cannot be serialized.
    pub fn issue_at(
        &self,
        subject_id: Uuid,
        login: &str,
        class: TokenClass,
        ttl: Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let ttl = i64::try_from(ttl.as_secs()).map_err(|_| TokenError::Encoding)?;
        let claims = TokenClaims {
            sub: subject_id,
            username: login.to_string(),
            class,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4(),
        };
        let header = TokenHeader {
            alg: SIGNING_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(&claims)?);
        let signature = self.sign(signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Validate a token of either class.
    ///
    /// # Errors
    /// Returns the first failing check, see [`TokenError`].
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, unix_now())
    }

    /// Validate a token and require a specific class.
    ///
    /// # Errors
    /// Any validation error, or [`TokenError::WrongTokenClass`].
    pub fn validate_as(&self, token: &str, expected: TokenClass) -> Result<TokenClaims, TokenError> {
        self.validate_as_at(token, expected, unix_now())
    }

    /// Like [`Self::validate_as`] with an explicit clock.
    ///
    /// # Errors
    /// Any validation error, or [`TokenError::WrongTokenClass`].
    pub fn validate_as_at(
        &self,
        token: &str,
        expected: TokenClass,
        now: i64,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_at(token, now)?;
        if claims.class != expected {
            return Err(TokenError::WrongTokenClass {
                expected,
                actual: claims.class,
            });
        }
        Ok(claims)
    }

    /// Validate a token as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    /// Returns the first failing check, see [`TokenError`].
    pub fn validate_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::MalformedToken)?;
        let claims_b64 = parts.next().ok_or(TokenError::MalformedToken)?;
        let sig_b64 = parts.next().ok_or(TokenError::MalformedToken)?;
        if parts.next().is_some() || header_b64.is_empty() || claims_b64.is_empty() {
            return Err(TokenError::MalformedToken);
        }

        let header = b64d_object(header_b64)?;
        match header.get("alg").and_then(Value::as_str) {
            Some(SIGNING_ALGORITHM) => {}
            Some(other) => return Err(TokenError::WrongSigningMethod(other.to_string())),
            None => return Err(TokenError::MalformedToken),
        }

        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::InvalidSignature)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims = claims_from_value(&b64d_object(claims_b64)?)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

fn claims_from_value(value: &serde_json::Map<String, Value>) -> Result<TokenClaims, TokenError> {
    let sub = value
        .get("sub")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(TokenError::MissingClaim("sub"))?;
    let username = value
        .get("username")
        .and_then(Value::as_str)
        .ok_or(TokenError::MissingClaim("username"))?
        .to_string();
    let class = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(TokenClass::parse)
        .ok_or(TokenError::MissingClaim("type"))?;
    let exp = value
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(TokenError::MissingClaim("exp"))?;
    let iat = value
        .get("iat")
        .and_then(Value::as_i64)
        .ok_or(TokenError::MissingClaim("iat"))?;
    let jti = value
        .get("jti")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(TokenError::MissingClaim("jti"))?;

    Ok(TokenClaims {
        sub,
        username,
        class,
        iat,
        exp,
        jti,
    })
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Encoding)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_object(s: &str) -> Result<serde_json::Map<String, Value>, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::MalformedToken)?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(TokenError::MalformedToken),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecretString::from(SECRET.to_string())).unwrap()
    }

    fn forge(header: &Value, claims: &Value, secret: &str) -> String {
        let signing_input = format!("{}.{}", b64e_json(header).unwrap(), b64e_json(claims).unwrap());
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        let sig = mac.finalize().into_bytes();
        format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&sig))
    }

    fn valid_claims() -> Value {
        serde_json::json!({
            "sub": Uuid::nil().to_string(),
            "username": "alice",
            "type": "access",
            "iat": NOW,
            "exp": NOW + 60,
            "jti": Uuid::nil().to_string(),
        })
    }

    #[test]
    fn rejects_short_secret() {
        let err = TokenCodec::new(&SecretString::from("too-short".to_string())).unwrap_err();
        assert_eq!(err, TokenError::WeakSecret);
    }

    #[test]
    fn issue_then_validate_returns_identity() {
        let codec = codec();
        let id = Uuid::new_v4();
        let token = codec
            .issue_at(id, "alice", TokenClass::Access, Duration::from_secs(900), NOW)
            .unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = codec.validate_at(&token, NOW + 1).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.class, TokenClass::Access);
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 900);
    }

    #[test]
    fn issue_with_real_clock_validates_now() {
        let codec = codec();
        let id = Uuid::new_v4();
        let token = codec
            .issue(id, "alice", TokenClass::Refresh, Duration::from_secs(60))
            .unwrap();
        let claims = codec.validate_as(&token, TokenClass::Refresh).unwrap();
        assert_eq!(claims.sub, id);
    }

    #[test]
    fn expiry_is_inclusive() {
        let codec = codec();
        let token = codec
            .issue_at(Uuid::new_v4(), "alice", TokenClass::Access, Duration::from_secs(10), NOW)
            .unwrap();
        assert!(codec.validate_at(&token, NOW + 9).is_ok());
        assert_eq!(
            codec.validate_at(&token, NOW + 10).unwrap_err(),
            TokenError::Expired
        );
        assert_eq!(
            codec.validate_at(&token, NOW + 3600).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn classes_are_not_interchangeable() {
        let codec = codec();
        let id = Uuid::new_v4();
        let ttl = Duration::from_secs(60);
        let access = codec.issue_at(id, "a", TokenClass::Access, ttl, NOW).unwrap();
        let refresh = codec.issue_at(id, "a", TokenClass::Refresh, ttl, NOW).unwrap();

        assert_eq!(
            codec
                .validate_as_at(&access, TokenClass::Refresh, NOW)
                .unwrap_err(),
            TokenError::WrongTokenClass {
                expected: TokenClass::Refresh,
                actual: TokenClass::Access,
            }
        );
        assert_eq!(
            codec
                .validate_as_at(&refresh, TokenClass::Access, NOW)
                .unwrap_err(),
            TokenError::WrongTokenClass {
                expected: TokenClass::Access,
                actual: TokenClass::Refresh,
            }
        );
        assert!(codec.validate_as_at(&access, TokenClass::Access, NOW).is_ok());
        assert!(codec.validate_as_at(&refresh, TokenClass::Refresh, NOW).is_ok());
    }

    #[test]
    fn tokens_issued_together_differ() {
        let codec = codec();
        let id = Uuid::new_v4();
        let ttl = Duration::from_secs(60);
        let first = codec.issue_at(id, "a", TokenClass::Access, ttl, NOW).unwrap();
        let second = codec.issue_at(id, "a", TokenClass::Access, ttl, NOW).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn tampering_any_signature_byte_is_detected() {
        let codec = codec();
        let token = codec
            .issue_at(Uuid::new_v4(), "alice", TokenClass::Access, Duration::from_secs(60), NOW)
            .unwrap();
        let (signing_input, sig) = token.rsplit_once('.').unwrap();

        for (index, original) in sig.char_indices() {
            // Values 0..32 of the alphabet; swapping across halves flips the high bit.
            let replacement = if "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdef".contains(original) {
                'z'
            } else {
                'A'
            };
            let mut tampered_sig = sig.to_string();
            tampered_sig.replace_range(index..=index, &replacement.to_string());
            let tampered = format!("{signing_input}.{tampered_sig}");
            assert_eq!(
                codec.validate_at(&tampered, NOW).unwrap_err(),
                TokenError::InvalidSignature,
                "position {index}"
            );
        }
    }

    #[test]
    fn tampered_claims_fail_signature() {
        let codec = codec();
        let token = codec
            .issue_at(Uuid::new_v4(), "alice", TokenClass::Access, Duration::from_secs(60), NOW)
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let mut claims = valid_claims();
        claims["username"] = Value::from("mallory");
        let forged = format!("{}.{}.{}", parts[0], b64e_json(&claims).unwrap(), parts[2]);
        assert_eq!(
            codec.validate_at(&forged, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});
        let token = forge(&header, &valid_claims(), "ffffffffffffffffffffffffffffffff");
        assert_eq!(
            codec().validate_at(&token, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let codec = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***", ".."] {
            assert_eq!(
                codec.validate_at(token, NOW).unwrap_err(),
                TokenError::MalformedToken,
                "{token:?}"
            );
        }
    }

    #[test]
    fn unexpected_algorithm_is_rejected_before_signature() {
        let codec = codec();
        for alg in ["none", "HS512", "RS256"] {
            let header = serde_json::json!({"alg": alg, "typ": "JWT"});
            let token = forge(&header, &valid_claims(), SECRET);
            assert_eq!(
                codec.validate_at(&token, NOW).unwrap_err(),
                TokenError::WrongSigningMethod(alg.to_string())
            );
        }
    }

    #[test]
    fn missing_or_mistyped_claims_are_reported() {
        let codec = codec();
        let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});

        let cases: [(&str, Value, &str); 5] = [
            ("sub", Value::Null, "sub"),
            ("sub", Value::from("not-a-uuid"), "sub"),
            ("username", Value::from(42), "username"),
            ("type", Value::from("admin"), "type"),
            ("exp", Value::from("tomorrow"), "exp"),
        ];
        for (field, replacement, expected) in cases {
            let mut claims = valid_claims();
            if replacement.is_null() {
                claims.as_object_mut().unwrap().remove(field);
            } else {
                claims[field] = replacement;
            }
            let token = forge(&header, &claims, SECRET);
            assert_eq!(
                codec.validate_at(&token, NOW).unwrap_err(),
                TokenError::MissingClaim(expected)
            );
        }
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("HS256"));
    }
}
