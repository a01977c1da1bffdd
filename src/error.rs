//! HTTP-facing error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::API_KEY_VAR;

/// Every failure a route can report, mapped onto a status code and a
/// `{ "error": .. }` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed client input.
    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The model credential was never configured.
    #[error("{} not configured", API_KEY_VAR)]
    NotConfigured,

    #[error("{0}")]
    NotFound(String),

    /// Upstream failure that carries the underlying cause separately.
    #[error("{message}")]
    Upstream { message: String, details: String },

    /// Extraction, model or storage failure with no safe default.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotConfigured | Self::Upstream { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            details: match self {
                Self::Upstream { details, .. } => Some(details),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
