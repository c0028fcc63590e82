use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::response;

/// Errors from issuing, validating or extracting admin tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("JWT not configured: {0}")]
    ConfigError(String),

    #[error("Token signing failed: {0}")]
    SigningError(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Invalid claim: {0}")]
    InvalidClaim(String),

    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidHeaderFormat,

    #[error("Invalid bearer token format")]
    InvalidBearerFormat,
}

impl JwtError {
    /// HTTP status an auth middleware should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            JwtError::ConfigError(_) | JwtError::SigningError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for JwtError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = response::error(
            self.to_string(),
            i64::from(status.as_u16()),
            serde_json::Value::Null,
        );
        (status, axum::Json(body)).into_response()
    }
}

/// Errors from parsing, validating or registering extension manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Extension name must not be empty")]
    EmptyName,

    #[error("Invalid version {version:?}: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid version requirement {requirement:?} for {name}: {source}")]
    InvalidRequirement {
        name: String,
        requirement: String,
        #[source]
        source: semver::Error,
    },

    #[error("Config field key must not be empty")]
    EmptyFieldKey,

    #[error("Duplicate config field {0:?}")]
    DuplicateField(String),

    #[error("Config field {0:?} needs at least one option")]
    MissingOptions(String),

    #[error("Default {value:?} of config field {field:?} is not one of its options")]
    InvalidDefault { field: String, value: String },

    #[error("Extension {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("Extension {0:?} is not registered")]
    NotRegistered(String),
}
