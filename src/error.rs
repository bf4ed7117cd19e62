//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::expense::ValidationErrors;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of a submitted expense broke the rules in
    /// [ExpenseSchema](crate::expense::ExpenseSchema).
    ///
    /// The client can recover by correcting the listed fields.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The request body could not be read as JSON.
    #[error("could not parse the request body: {0}")]
    InvalidRequestBody(String),

    /// The session cookie is missing, could not be decrypted, or has expired.
    #[error("the session cookie is missing, invalid or expired")]
    Unauthorized,

    /// The `state` parameter sent back by the identity provider did not match
    /// the one stored in the session before the redirect.
    #[error("the OAuth state parameter did not match the session")]
    InvalidOAuthState,

    /// A request to the identity provider failed or returned something we
    /// could not understand.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("the identity provider request failed: {0}")]
    IdentityProvider(String),

    /// The requested resource was not found.
    ///
    /// Expenses owned by another user are reported as not found so that
    /// clients cannot probe for IDs they do not own.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// There was an error formatting or parsing the session expiry.
    #[error("could not format session expiry date-time: {0}")]
    InvalidDateFormat(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Validation failed",
                    "fields": errors,
                })),
            )
                .into_response(),
            Error::InvalidRequestBody(reason) => {
                tracing::debug!("rejected request body: {reason}");
                error_response(StatusCode::BAD_REQUEST, "Invalid request body")
            }
            Error::Unauthorized | Error::InvalidOAuthState => {
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            Error::IdentityProvider(reason) => {
                tracing::error!("identity provider error: {reason}");
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            Error::NotFound => error_response(StatusCode::NOT_FOUND, "Not found"),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// A JSON response of the form `{"error": message}`.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
