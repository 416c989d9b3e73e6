use axum::http::header::{HeaderValue, ALLOW};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::datastore::{DataStoreError, StorageError};
use crate::model::ModelError;

// Startup and shutdown errors of the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to create runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("cannot resolve listen address {0}")]
    Address(String),
    #[error("cannot bind api listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error(transparent)]
    DataStore(#[from] DataStoreError),
}

/// Failure of a single API request. Only `kind` and a generic message ever
/// reach the client; the detail is for the server log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("request body rejected: {0}")]
    TooLarge(String),
    #[error("no route for {0}")]
    NotFound(String),
    #[error("method {method} is not allowed on {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allow: &'static str,
    },
    #[error("task storage is unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::TooLarge(_) => "payload_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::StoreUnavailable(_) => "store_unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to any client.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::TooLarge(_) => "request body is too large".to_string(),
            ApiError::NotFound(_) => "resource not found".to_string(),
            ApiError::MethodNotAllowed { .. } => "method not allowed".to_string(),
            ApiError::StoreUnavailable(_) => "task storage is unavailable".to_string(),
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                kind: self.kind().to_string(),
                message: self.public_message(),
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(_) => ApiError::StoreUnavailable(err.to_string()),
            StorageError::Query(_) | StorageError::Corrupt(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            error!(reason = %self, kind = self.kind(), "Request failed.");
        } else {
            warn!(reason = %self, kind = self.kind(), "Request rejected.");
        }
        let mut response = (self.status(), Json(self.envelope())).into_response();
        if let ApiError::MethodNotAllowed { allow, .. } = self {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

/// `{"error": {"kind": "...", "message": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}
