use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

/// Failures the API reports as `{error, message, detail}` documents.
#[derive(Debug, thiserror::Error)]
pub enum ApiFailure {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication failed: invalid credentials")]
    InvalidCredentials,

    #[error("Authentication failed: Access token expired or was invalid")]
    InvalidAccessToken,

    #[error("Authentication failed: Refresh token expired or was invalid")]
    InvalidRefreshToken,

    #[error("Access denied")]
    AccessDenied,

    #[error("Unable to find {entity} with {property}={value}")]
    EntityNotFound {
        entity: &'static str,
        property: &'static str,
        value: String,
    },

    #[error("Entity {entity} with {field}={value} already exists")]
    DuplicateEntity {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
}

impl ApiFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidAccessToken | Self::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotAuthenticated | Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::EntityNotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidAccessToken => "invalid_access_token",
            Self::InvalidRefreshToken => "invalid_refresh_token",
            Self::AccessDenied => "access_denied",
            Self::EntityNotFound { .. } => "entity_not_found",
            Self::DuplicateEntity { .. } => "duplicate_entity",
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
            detail: None,
        };
        (self.status(), Json(body)).into_response()
    }
}
