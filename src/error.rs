use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sqlx::error::ErrorKind;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

use crate::handlers::envelope::Envelope;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    /// Message shown to clients when the route reports the error's own text.
    pub fn message(&self) -> String {
        match self {
            AppError::DatabaseError(DatabaseError::ConstraintViolation { message, .. }) => {
                message.clone()
            }
            AppError::ValidationError(reason) => reason.clone(),
            AppError::DatabaseError(DatabaseError::ConnectionError(_)) => {
                "Database unavailable".to_string()
            }
            AppError::ConfigError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Detail that is safe to put in the envelope's `exception` field.
    pub fn detail(&self) -> Option<String> {
        match self {
            AppError::DatabaseError(DatabaseError::ConstraintViolation { message, detail }) => {
                Some(detail.clone().unwrap_or_else(|| message.clone()))
            }
            AppError::DatabaseError(DatabaseError::ConnectionError(_)) => {
                Some("Database unavailable".to_string())
            }
            AppError::DatabaseError(DatabaseError::QueryError(reason)) => Some(reason.clone()),
            AppError::StorageError(_) => Some("Failed to store image".to_string()),
            AppError::ValidationError(reason) => Some(reason.clone()),
            AppError::ConfigError(_) | AppError::InternalError(_) => None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(DatabaseError::from(err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(DatabaseError::QueryError(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

// Every failure is reported inside the envelope; the transport status stays 200.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let message = self.message();
        Envelope::<()>::failure(self, message).respond()
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("{message}")]
    ConstraintViolation {
        message: String,
        detail: Option<String>,
    },
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => DatabaseError::ConstraintViolation {
                    message: db_err.message().to_string(),
                    detail: db_err
                        .try_downcast_ref::<PgDatabaseError>()
                        .and_then(|pg| pg.detail())
                        .map(str::to_string),
                },
                _ => DatabaseError::QueryError(db_err.message().to_string()),
            },
            err @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)) => DatabaseError::ConnectionError(err.to_string()),
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write image {key}: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove image {key}: {source}")]
    RemoveFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
