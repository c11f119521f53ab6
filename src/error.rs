use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

/// Message returned for any token fault; the cause stays in the server log.
pub const SIGN_IN_AGAIN: &str = "Invalid token. Try signing back in";

/// Token faults the user can fix by authenticating again.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("no token provided")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
}

/// Deployment faults the operator has to fix.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("secret missing")]
    SecretMissing,
    #[error("{0} must be set")]
    MissingVar(&'static str),
}

/// The database could not be reached at startup. Fatal.
#[derive(Debug, Error)]
#[error("database unreachable")]
pub struct ConnectionError(#[source] pub sqlx::Error);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Auth(a) => ApiError::Auth(a),
            VerifyError::Config(c) => ApiError::Config(c),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Config(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Token and server faults are generalized.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Auth(_) => SIGN_IN_AGAIN.to_string(),
            ApiError::Config(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Config(e) => error!(error = %e, "server misconfigured"),
            ApiError::Internal(e) => error!(error = ?e, "internal error"),
            _ => {}
        }
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}
