//! Mapping from ledger errors to HTTP responses.

use crate::error::LedgerError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            LedgerError::InvalidOperation(_)
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::ValidationError(_) => Self::bad_request(err.to_string()),
            _ => {
                error!(error = %err, "Ledger operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            warn!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }
        let body = ErrorBody {
            timestamp: Utc::now(),
            status: self.status.as_u16(),
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LedgerError::NotFound("wallet not found".into()), StatusCode::NOT_FOUND),
            (
                LedgerError::InvalidOperation("same wallet".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LedgerError::InsufficientFunds {
                    wallet_id: 1,
                    balance: dec!(0),
                    requested: dec!(1),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                LedgerError::ValidationError("amount must be greater than 0".into()),
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::LockTimeout(3), StatusCode::INTERNAL_SERVER_ERROR),
            (
                LedgerError::UniquenessViolation("k".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let api = ApiError::from(LedgerError::internal("disk on fire"));
        assert_eq!(api.message(), "internal server error");
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let api = ApiError::from(LedgerError::NotFound("transfer not found".into()));
        assert_eq!(api.message(), "transfer not found");
    }
}
