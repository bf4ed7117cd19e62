//! Defines the endpoint for getting a single expense.

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
    expense::{core::get_expense, parse_expense_id},
};

/// The state needed to get an expense.
#[derive(Debug, Clone)]
pub struct GetExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GetExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for getting one of the signed-in user's expenses.
///
/// Responds with `404 Not Found` if the ID is not a number, does not exist,
/// or belongs to someone else.
pub async fn get_expense_endpoint(
    State(state): State<GetExpenseState>,
    Extension(identity): Extension<Identity>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, Error> {
    let id = parse_expense_id(&raw_id)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expense = get_expense(id, &identity.id, &connection)?;

    Ok(Json(json!({ "expense": expense })))
}
