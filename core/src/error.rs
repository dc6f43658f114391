//! Error types for the bulletin API client.
//!
//! # Design
//! The remote API answers every failure with a JSON document
//! `{error, message, detail}`. `ApiError::Status` carries that document
//! together with the HTTP status so callers (and the auth orchestrator)
//! can branch on the machine-readable `code`. Network, encoding and decoding
//! failures get their own variants. `Error` is what a [`Session`] call
//! returns: either an `ApiError` or a redirect to the login page.
//!
//! [`Session`]: crate::session::Session

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Redirect;

/// Error codes the client recognises by name.
pub mod codes {
    pub const INVALID_ACCESS_TOKEN: &str = "invalid_access_token";
    pub const INVALID_REFRESH_TOKEN: &str = "invalid_refresh_token";
    pub const NOT_AUTHENTICATED: &str = "not_authenticated";
    pub const ENTITY_NOT_FOUND: &str = "entity_not_found";
    /// Used when a non-2xx body is not an error document.
    pub const UNEXPECTED_RESPONSE: &str = "unexpected_response";
}

/// The error document returned by the remote API on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

/// Errors produced while talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{}", describe_status(.status, .code, .message, .detail.as_ref()))]
    Status {
        status: u16,
        code: String,
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn from_document(status: u16, document: ErrorDocument) -> Self {
        ApiError::Status {
            status,
            code: document.error,
            message: document.message,
            detail: document.detail,
        }
    }

    /// The error raised locally when no access token is available.
    pub fn not_authenticated() -> Self {
        ApiError::Status {
            status: 403,
            code: codes::NOT_AUTHENTICATED.to_string(),
            message: "Not authenticated".to_string(),
            detail: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_invalid_access_token(&self) -> bool {
        self.code() == Some(codes::INVALID_ACCESS_TOKEN)
    }

    pub fn is_invalid_refresh_token(&self) -> bool {
        self.code() == Some(codes::INVALID_REFRESH_TOKEN)
    }

    pub fn is_not_authenticated(&self) -> bool {
        self.code() == Some(codes::NOT_AUTHENTICATED)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn describe_status(
    status: &u16,
    code: &str,
    message: &str,
    detail: Option<&serde_json::Value>,
) -> String {
    match detail {
        Some(detail) if !detail.is_null() => format!("{message} ({status} {code}): {detail}"),
        _ => format!("{message} ({status} {code})"),
    }
}

/// The result of a call made through a [`Session`](crate::session::Session).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session cannot be recovered; the user has to log in again.
    #[error("authentication required, redirect to {}", .0.target())]
    Redirect(Redirect),
}

impl Error {
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            Error::Redirect(_) => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Error::Redirect(_))
    }
}

/// Errors raised while loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid api base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
