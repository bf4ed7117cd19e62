//! Defines the endpoint for the total amount the signed-in user has spent.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{AppState, Error, auth::Identity, expense::core::total_spent};

/// The state needed to total expenses.
#[derive(Debug, Clone)]
pub struct TotalSpentState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TotalSpentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the sum of the signed-in user's expenses, e.g.
/// `{"total": "12.50"}`.
pub async fn get_total_spent_endpoint(
    State(state): State<TotalSpentState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let total = total_spent(&identity.id, &connection)?;

    Ok(Json(json!({ "total": total })))
}
