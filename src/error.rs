use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{auth::TokenError, repository::StoreError};

/// ApiResult
///
/// Shorthand used by every handler and collection accessor.
pub type ApiResult<T> = Result<T, ApiError>;

/// ApiError
///
/// The request-scoped error taxonomy. Each variant maps to exactly one HTTP status,
/// and a failure only ever terminates the request that produced it.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A path parameter could not be parsed into a document identifier.
    #[error("Invalid document id: {0}")]
    InvalidId(String),

    /// The submitted document failed its entity schema check.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No bearer credential was presented to a protected route.
    #[error("unauthorized access")]
    Unauthenticated,

    /// A bearer credential was presented but did not verify (expired, malformed, bad signature).
    #[error("Forbidden access")]
    Forbidden,

    /// A unique business key is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(key) => ApiError::Conflict(format!("{key} already exists")),
            other => ApiError::Store(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            // Verification failures are the caller's problem, never a server fault.
            TokenError::Invalid(_) => ApiError::Forbidden,
            other => ApiError::Signing(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Signing(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side faults are logged with their cause; the client only sees a generic message.
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!("store error: {:?}", e);
                "internal store error".to_string()
            }
            ApiError::Signing(e) => {
                tracing::error!("token signing error: {}", e);
                "could not issue access token".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
