use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

/// Signing algorithm accepted by the gate; tokens declaring anything else are rejected
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Errors that can occur while verifying a bearer token
///
/// Both variants are reported to clients identically; the distinction is
/// kept for logs and metrics.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,
}

/// Claims extracted from a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthClaims {
    pub subject: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub raw_claims: Map<String, Value>,
}

/// Verifies HS256 bearer tokens against a shared secret
#[derive(Clone)]
pub struct AuthGate {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    issuer: Option<String>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("algorithm", &ALGORITHM)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Verify `token` at unix time `now`
    ///
    /// Expiry is decided first from the unverified payload, so an expired
    /// token is reported as [`AuthError::TokenExpired`] whatever its signature.
    pub fn verify(&self, token: &str, now: i64) -> Result<AuthClaims, AuthError> {
        let unverified = self.read_payload(token)?;
        let expires_at = unverified
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| AuthError::InvalidToken("missing or non-integer exp claim".to_string()))?;
        if expires_at <= now {
            return Err(AuthError::TokenExpired);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let raw_claims = data.claims;

        let subject = raw_claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("sub claim must be a non-empty string".to_string()))?
            .to_string();
        let issued_at = raw_claims
            .get("iat")
            .and_then(Value::as_i64)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
        let expires_at = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("exp out of range".to_string()))?;

        Ok(AuthClaims {
            subject,
            issued_at,
            expires_at,
            raw_claims,
        })
    }

    /// Decode the payload without checking the signature
    fn read_payload(&self, token: &str) -> Result<Map<String, Value>, AuthError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Mint a token for `subject` valid for `ttl_secs` from `now`
    pub fn issue(&self, subject: &str, ttl_secs: i64, now: i64) -> Result<String, AuthError> {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from(subject));
        claims.insert("iat".to_string(), Value::from(now));
        claims.insert("exp".to_string(), Value::from(now + ttl_secs));
        if let Some(issuer) = &self.issuer {
            claims.insert("iss".to_string(), Value::from(issuer.as_str()));
        }

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
