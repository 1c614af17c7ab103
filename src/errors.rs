use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::correlation::CorrelationId;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// A customer with the same email or phone already exists.
    CustomerExists,
    /// No customer with the requested id.
    CustomerNotFound,
    /// The phone number belongs to another customer.
    PhoneInUse,
    /// Malformed or invalid request payload, path or query.
    Validation(String),
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Internal server error.
    InternalError(String),
}

impl AppError {
    /// Stable machine-readable code exposed to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::CustomerExists => "CUSTOMER_EXISTS",
            AppError::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            AppError::PhoneInUse => "PHONE_IN_USE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DatabaseError(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::CustomerExists | AppError::PhoneInUse => StatusCode::BAD_REQUEST,
            AppError::CustomerNotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller. Storage details never leave the process.
    fn public_message(&self) -> String {
        match self {
            AppError::CustomerExists => {
                "Customer with this email or phone already exists".to_string()
            }
            AppError::CustomerNotFound => "Customer not found".to_string(),
            AppError::PhoneInUse => "Phone already associated with another customer".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::CustomerExists => write!(f, "Customer already exists"),
            AppError::CustomerNotFound => write!(f, "Customer not found"),
            AppError::PhoneInUse => write!(f, "Phone already in use"),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DatabaseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

/// Structured error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable error code.
    #[schema(example = "CUSTOMER_NOT_FOUND")]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

/// An [`AppError`] bound to the correlation id of the request that produced it.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub correlation_id: CorrelationId,
}

impl IntoResponse for ApiError {
    /// Maps each error variant to its status code and a structured JSON body.
    /// Unexpected failures are logged here and masked for the caller.
    fn into_response(self) -> Response {
        match &self.error {
            AppError::DatabaseError(e) => {
                tracing::error!(error = ?e, "Database error");
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
            other => {
                tracing::debug!(code = other.code(), "Request rejected: {}", other);
            }
        }

        let body = ErrorBody {
            code: self.error.code().to_string(),
            message: Some(self.error.public_message()),
            correlation_id: self.correlation_id.to_string(),
        };

        (self.error.status(), Json(body)).into_response()
    }
}

/// Extension trait binding errors to the request correlation id.
pub trait ResultExt<T> {
    fn correlate(self, correlation_id: &CorrelationId) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn correlate(self, correlation_id: &CorrelationId) -> Result<T, ApiError> {
        self.map_err(|error| ApiError {
            error,
            correlation_id: correlation_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_expected_statuses() {
        assert_eq!(AppError::CustomerExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::PhoneInUse.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CustomerNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InternalError("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn correlate_attaches_request_id() {
        let cid = CorrelationId::from("abc-123".to_string());
        let result: Result<(), AppError> = Err(AppError::CustomerNotFound);
        let api_err = result.correlate(&cid).unwrap_err();
        assert_eq!(api_err.correlation_id.as_str(), "abc-123");
        assert_eq!(api_err.error.code(), "CUSTOMER_NOT_FOUND");
    }
}
