//! Defines the endpoint for creating a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Identity,
    expense::{CreateExpense, Expense, ExpenseSchema, core::create_expense},
};

/// The state needed to create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new expense owned by the signed-in user.
///
/// Responds with the created expense and `201 Created`, or `400 Bad Request`
/// listing every invalid field.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<CreateExpense>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), Error> {
    let Json(body) = body.map_err(|rejection| Error::InvalidRequestBody(rejection.body_text()))?;
    let new_expense = ExpenseSchema::validate(&body).map_err(Error::Validation)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expense = create_expense(new_expense, &identity.id, &connection)?;

    tracing::info!("user {} created expense {}", identity.id, expense.id);

    Ok((StatusCode::CREATED, Json(expense)))
}
