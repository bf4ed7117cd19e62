//! Defines the endpoint for deleting an expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::Identity,
    expense::{core::delete_expense, parse_expense_id},
};

/// The state needed to delete an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the signed-in user's expenses,
/// responds with the deleted expense.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Extension(identity): Extension<Identity>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, Error> {
    let id = parse_expense_id(&raw_id)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expense = delete_expense(id, &identity.id, &connection)?;

    tracing::info!("user {} deleted expense {id}", identity.id);

    Ok(Json(json!({ "expense": expense })))
}
