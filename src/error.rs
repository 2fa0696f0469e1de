// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::crud::CrudError;
use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::Unauthorized(msg) => ApiError::unauthorized(msg),
            CrudError::Validation(msg) => ApiError::validation_error(msg),
            CrudError::NotFound(msg) => ApiError::bad_request(msg),
            CrudError::Store(StoreError::Connection(msg)) => {
                tracing::error!("Store connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            CrudError::Store(e) => {
                // Don't expose internal store errors to clients
                tracing::error!("Store error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            CrudError::Hashing(e) => {
                tracing::error!("Hashing error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_bad_request() {
        let err = ApiError::from(CrudError::not_found("users"));
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.to_json(),
            json!({"error": true, "message": "No doc found in users", "code": "BAD_REQUEST"})
        );
    }

    #[test]
    fn store_details_are_not_leaked() {
        let err = ApiError::from(CrudError::Store(StoreError::Query("syntax error at or near".into())));
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("syntax"));

        let err = ApiError::from(CrudError::Store(StoreError::Connection("refused".into())));
        assert_eq!(err.status_code(), 503);

        let err = ApiError::from(CrudError::Store(StoreError::from(sqlx::Error::PoolTimedOut)));
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn access_denials_are_unauthorized() {
        let err = ApiError::from(CrudError::Unauthorized("You do not have read access".into()));
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }
}
