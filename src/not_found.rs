//! The fallback for routes that do not exist.

use axum::response::{IntoResponse, Response};

use crate::Error;

/// Respond with `404 {"error": "Not found"}`.
pub async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
