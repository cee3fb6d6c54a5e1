//! Error types for Velin server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Tagged domain rule codes carried untouched to the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCode {
    BookNotFound,
    BookAvailable,
    BookUnavailable,
    DuplicateReservation,
    MembershipExpired,
    UnauthorizedCancel,
    UnauthorizedPickup,
    InvalidReservationStatus,
    ReservationNotFound,
    BookNotAvailable,
    ExtendBlockedByReservation,
    InvalidLoanStatus,
    FeeAlreadySettled,
}

impl RuleCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::BookNotFound => "BOOK_NOT_FOUND",
            RuleCode::BookAvailable => "BOOK_AVAILABLE",
            RuleCode::BookUnavailable => "BOOK_UNAVAILABLE",
            RuleCode::DuplicateReservation => "DUPLICATE_RESERVATION",
            RuleCode::MembershipExpired => "MEMBERSHIP_EXPIRED",
            RuleCode::UnauthorizedCancel => "UNAUTHORIZED_CANCEL",
            RuleCode::UnauthorizedPickup => "UNAUTHORIZED_PICKUP",
            RuleCode::InvalidReservationStatus => "INVALID_RESERVATION_STATUS",
            RuleCode::ReservationNotFound => "RESERVATION_NOT_FOUND",
            RuleCode::BookNotAvailable => "BOOK_NOT_AVAILABLE",
            RuleCode::ExtendBlockedByReservation => "EXTEND_BLOCKED_BY_RESERVATION",
            RuleCode::InvalidLoanStatus => "INVALID_LOAN_STATUS",
            RuleCode::FeeAlreadySettled => "FEE_ALREADY_SETTLED",
        }
    }

    /// Missing-entity rules answer 404, every other violated precondition 422
    fn status(&self) -> StatusCode {
        match self {
            RuleCode::BookNotFound | RuleCode::ReservationNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{code}: {message}")]
    Rule { code: RuleCode, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn rule(code: RuleCode, message: impl Into<String>) -> Self {
        AppError::Rule {
            code,
            message: message.into(),
        }
    }

    /// The stable code string surfaced in the error response body
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Rule { code, .. } => code.as_str(),
            AppError::Validation(_) => "VALIDATION",
            AppError::Database(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Rule { code, message } => (code.status(), message.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_codes_are_stable_strings() {
        assert_eq!(RuleCode::BookUnavailable.as_str(), "BOOK_UNAVAILABLE");
        assert_eq!(
            RuleCode::ExtendBlockedByReservation.as_str(),
            "EXTEND_BLOCKED_BY_RESERVATION"
        );
        assert_eq!(
            AppError::rule(RuleCode::DuplicateReservation, "already queued").code(),
            "DUPLICATE_RESERVATION"
        );
    }

    #[test]
    fn missing_entity_rules_map_to_not_found() {
        assert_eq!(RuleCode::BookNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RuleCode::ReservationNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            RuleCode::BookAvailable.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
