//! Defines the route handler for getting the signed-in user.

use axum::{Extension, Json};
use serde_json::{Value, json};

use crate::auth::Identity;

/// Get the signed-in user.
///
/// Must be behind [auth_guard](crate::auth::auth_guard), which rejects
/// requests without a valid session with a 401.
pub async fn get_current_user(Extension(identity): Extension<Identity>) -> Json<Value> {
    Json(json!({ "user": identity }))
}
