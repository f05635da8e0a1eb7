//! Shared API types
//!
//! Error handling and query-parameter helpers used across endpoints.
//! Internal failures are logged server-side with full detail; the response
//! body carries a stable code and a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use validator::ValidationError;

use crate::data::PostgresError;
use crate::utils::time::parse_iso_timestamp;

/// Maximum page size for the pipeline listing
pub const MAX_LIST_LIMIT: u32 = 1000;
/// Default page size for the pipeline listing
pub const DEFAULT_LIST_LIMIT: u32 = 100;

pub fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

/// Parse a required ISO 8601 / RFC 3339 timestamp query parameter
pub fn parse_timestamp_param(name: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    parse_iso_timestamp(value).ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_TIMESTAMP",
            format!("Invalid {} timestamp: {}. Use ISO 8601 format.", name, value),
        )
    })
}

/// Validator function for the listing limit parameter
pub fn validate_list_limit(limit: u32) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(ValidationError::new("limit_range")
            .with_message(format!("Limit must be between 1 and {}", MAX_LIST_LIMIT).into()));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_postgres(e: PostgresError) -> Self {
        tracing::error!(error = %e, "Database error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_param_valid() {
        let dt = parse_timestamp_param("start", "2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1705314600);
    }

    #[test]
    fn test_parse_timestamp_param_invalid() {
        let err = parse_timestamp_param("start", "yesterday").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn test_validate_list_limit_bounds() {
        assert!(validate_list_limit(1).is_ok());
        assert!(validate_list_limit(MAX_LIST_LIMIT).is_ok());
        assert!(validate_list_limit(0).is_err());
        assert!(validate_list_limit(MAX_LIST_LIMIT + 1).is_err());
    }
}
