//! Handler error type and its mapping onto JSON error responses

use lambda_http::{Body, Response};
use thiserror::Error;

use crate::http::error_response;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Reported with status 400, matching the storefront client's expectations
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method '{0}' is not supported")]
    MethodNotAllowed(String),

    #[error("Action '{0}' is not supported")]
    UnsupportedAction(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) | ApiError::UnsupportedAction(_) => 405,
            ApiError::Internal(_) | ApiError::Database(_) => 500,
        }
    }

    /// Short title placed in the `details` field of the body
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad Request",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::NotFound(_) => "Not Found",
            ApiError::MethodNotAllowed(_) | ApiError::UnsupportedAction(_) => "Method not allowed",
            ApiError::Internal(_) => "Internal Error",
            ApiError::Database(_) => "Database Error",
        }
    }

    /// `{"error": <message>, "details": <title>}`
    pub fn into_response(self) -> Response<Body> {
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!(error = ?e, "database failure");
                "The request could not be completed".to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                msg.clone()
            }
            other => other.to_string(),
        };
        error_response(self.status_code(), &message, self.title(), None)
    }
}

/// True when a database error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn body_json(response: &Response<Body>) -> Value {
        match response.body() {
            Body::Text(s) => serde_json::from_str(s).expect("json body"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::conflict("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::MethodNotAllowed("PATCH".into()).status_code(), 405);
        assert_eq!(ApiError::UnsupportedAction("logout".into()).status_code(), 405);
        assert_eq!(ApiError::Database(sqlx::Error::RowNotFound).status_code(), 500);
    }

    #[test]
    fn test_error_body_has_error_field() {
        let response = ApiError::not_found("Order not found").into_response();
        assert_eq!(response.status(), 404);
        let body = body_json(&response);
        assert_eq!(body["error"], "Order not found");
        assert_eq!(body["details"], "Not Found");
    }

    #[test]
    fn test_database_error_hides_details() {
        let response = ApiError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), 500);
        let body = body_json(&response);
        assert_eq!(body["details"], "Database Error");
        assert_eq!(body["error"], "The request could not be completed");
    }

    #[test]
    fn test_unique_violation_only_for_database_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
