use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Convert a store error into the most specific AppError.
///
/// Constraint violations and transaction conflicts become `Conflict`; the
/// transaction they happened in is rolled back when it is dropped.
pub fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                return AppError::Conflict("A record with the same key already exists".to_string())
            }
            // foreign_key_violation
            Some("23503") => {
                return AppError::Conflict("Referenced record does not exist".to_string())
            }
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => {
                tracing::warn!("Transaction conflict: {}", db_err);
                return AppError::Conflict(
                    "Concurrent modification detected, please retry".to_string(),
                );
            }
            _ => {}
        }
    }

    tracing::error!("Database error: {:?}", e);
    AppError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        assert!(matches!(
            handle_db_error(sqlx::Error::PoolTimedOut),
            AppError::Database(sqlx::Error::PoolTimedOut)
        ));
    }
}
