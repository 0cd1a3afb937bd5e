use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::source::SourceError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// Business-rule violations detected before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Current stock cannot exceed capacity ({current_stock} > {capacity})")]
    StockExceedsCapacity { capacity: u32, current_stock: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Bin not found: {0}")]
    NotFound(String),

    #[error("Invalid bin ID format: {0}")]
    InvalidId(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Bin number already exists: {0}")]
    DuplicateBinNumber(String),

    #[error("Backing source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidId(_)
            | Self::InvalidQuery(_)
            | Self::DuplicateBinNumber(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Source failures return a generic message to avoid leaking connection details.
    pub fn response_message(&self) -> String {
        match self {
            Self::SourceUnavailable(_) => "Backing source unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Stable machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::MissingField(_)) => "missing_field",
            Self::Validation(ValidationError::StockExceedsCapacity { .. }) => {
                "stock_exceeds_capacity"
            }
            Self::NotFound(_) => "not_found",
            Self::InvalidId(_) => "invalid_id",
            Self::InvalidQuery(_) => "invalid_query",
            Self::DuplicateBinNumber(_) => "duplicate_bin_number",
            Self::SourceUnavailable(_) => "source_unavailable",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
