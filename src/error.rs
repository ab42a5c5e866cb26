//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: entity {entity} field {field}")]
    InvalidPrimaryKey { entity: String, field: String },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate field: entity {entity} field {field}")]
    DuplicateField { entity: String, field: String },
    #[error("entities {first} and {second} both derive type name {type_name}")]
    DuplicateTypeName { type_name: String, first: String, second: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },
}

/// Failures reported by a [`crate::mapper::Mapper`]. "No matching row" is not an error;
/// the id-addressed primitives return `None` for it.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// The database rejected a value for its column type (SQLSTATE class 22).
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Mapper(MapperError::InvalidValue(_)) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Mapper(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    fn new(status: StatusCode, message: String) -> Self {
        ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::NotFound => status.into_response(),
            AppError::BadRequest(message) | AppError::Mapper(MapperError::InvalidValue(message)) => {
                (status, Json(ErrorBody::new(status, message))).into_response()
            }
            AppError::Config(e) => {
                tracing::error!(error = %e, "configuration error while serving request");
                generic(status)
            }
            AppError::Mapper(e) => {
                tracing::error!(error = %e, "persistence failure");
                generic(status)
            }
        }
    }
}

fn generic(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error").to_string();
    (status, Json(ErrorBody::new(status, reason))).into_response()
}
