use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ApiError;

/// Lifetime of every issued access token (24 hours).
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// TokenError
///
/// Failures of the bearer token service. `Invalid` covers every verification
/// failure (expired, malformed, bad signature); the other variants are issuance faults.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims
///
/// The JWT payload: whatever object the caller submitted at login, plus the
/// registered `iat`/`exp` timestamps appended by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: i64,
    /// Expiration Time (exp). The token is accepted up to and including this second.
    pub exp: i64,
    /// The submitted user object, stored verbatim.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// TokenService
///
/// Issues and verifies HS256 bearer tokens with the process-wide secret.
/// Cheap to clone; lives in `AppState` and is pulled out via `FromRef`.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs `payload` with an expiry 24 hours from now.
    pub fn issue(&self, payload: Map<String, Value>) -> Result<String, TokenError> {
        self.issue_at(payload, Utc::now().timestamp())
    }

    /// Signs `payload` as if issued at `issued_at` (Unix seconds).
    ///
    /// Caller-supplied `iat`/`exp` keys are dropped so the service alone decides the lifetime.
    pub fn issue_at(
        &self,
        mut payload: Map<String, Value>,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        payload.remove("iat");
        payload.remove("exp");

        let claims = Claims {
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECS,
            payload,
        };

        let key = EncodingKey::from_secret(self.secret.as_bytes());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }

    /// Validates signature and expiry against the current clock.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Validates signature and expiry against an explicit clock reading.
    ///
    /// The library's own expiry check reads the system clock and applies a leeway,
    /// so it is disabled here and the `exp` comparison is done against `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        // The payload is caller-defined, so an `aud` key in it carries no meaning.
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        if data.claims.exp < now {
            return Err(TokenError::Invalid("token has expired".to_string()));
        }

        Ok(data.claims)
    }
}

/// bearer_token
///
/// Pulls the raw token out of an `Authorization: Bearer <token>` header value.
/// Returns `None` when the value is not a usable bearer credential.
pub fn bearer_token(value: &HeaderValue) -> Option<&str> {
    value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// authorize
///
/// The access gate decision: no `Authorization` header is 401. A header that is
/// present but does not carry a verifying bearer token is 403. Otherwise the
/// decoded claims.
pub fn authorize(headers: &HeaderMap, tokens: &TokenService) -> Result<Claims, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;
    let token = bearer_token(value).ok_or(ApiError::Forbidden)?;

    tokens.verify(token).map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        ApiError::Forbidden
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "unit-test-secret";

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn token_is_valid_for_exactly_one_day() {
        let service = TokenService::new(SECRET);
        let issued_at = 1_700_000_000;
        let token = service
            .issue_at(payload(json!({ "email": "a@b.com" })), issued_at)
            .unwrap();

        let claims = service.verify_at(&token, issued_at).unwrap();
        assert_eq!(claims.payload["email"], "a@b.com");
        assert_eq!(claims.exp, issued_at + TOKEN_TTL_SECS);

        assert!(service.verify_at(&token, issued_at + TOKEN_TTL_SECS).is_ok());

        let expired = service.verify_at(&token, issued_at + TOKEN_TTL_SECS + 1);
        assert!(matches!(expired, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn caller_cannot_extend_lifetime() {
        let service = TokenService::new(SECRET);
        let token = service
            .issue_at(payload(json!({ "email": "a@b.com", "exp": 9_999_999_999i64 })), 100)
            .unwrap();

        let claims = service.verify_at(&token, 100).unwrap();
        assert_eq!(claims.exp, 100 + TOKEN_TTL_SECS);
        assert!(!claims.payload.contains_key("exp"));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new("another-secret");
        let token = issuer.issue(payload(json!({ "email": "x@y.z" }))).unwrap();

        let result = TokenService::new(SECRET).verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let result = TokenService::new(SECRET).verify("not.a.jwt");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn missing_secret_is_a_signing_error() {
        let result = TokenService::new("").issue(Map::new());
        assert!(matches!(result, Err(TokenError::MissingSecret)));
    }

    #[test]
    fn authorize_distinguishes_missing_and_bad_credentials() {
        let service = TokenService::new(SECRET);
        let mut headers = HeaderMap::new();

        assert!(matches!(
            authorize(&headers, &service),
            Err(ApiError::Unauthenticated)
        ));

        for unusable in ["Bearer garbage", "Basic abc", "Bearer", "Bearer   "] {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(unusable));
            assert!(
                matches!(authorize(&headers, &service), Err(ApiError::Forbidden)),
                "{unusable:?} should be forbidden"
            );
        }

        let token = service.issue(payload(json!({ "email": "a@b.com" }))).unwrap();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let claims = authorize(&headers, &service).unwrap();
        assert_eq!(claims.payload["email"], "a@b.com");
    }
}
