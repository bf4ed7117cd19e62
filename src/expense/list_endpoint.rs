//! Defines the endpoint for listing the signed-in user's expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::Identity,
    expense::core::{MAX_LIST_LIMIT, list_expenses},
};

/// The state needed to list expenses.
#[derive(Debug, Clone)]
pub struct ListExpensesState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListExpensesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for listing expenses.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpensesQuery {
    /// The most expenses to return, clamped to between 1 and [MAX_LIST_LIMIT].
    pub limit: Option<i64>,
}

impl ListExpensesQuery {
    fn limit(&self) -> u32 {
        self.limit
            .map(|limit| limit.clamp(1, i64::from(MAX_LIST_LIMIT)))
            .and_then(|limit| u32::try_from(limit).ok())
            .unwrap_or(MAX_LIST_LIMIT)
    }
}

/// A route handler for listing the signed-in user's most recent expenses,
/// newest first.
///
/// A malformed `limit` is ignored rather than rejected.
pub async fn list_expenses_endpoint(
    State(state): State<ListExpensesState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<ListExpensesQuery>, QueryRejection>,
) -> Result<Json<Value>, Error> {
    let query = query.map(|Query(query)| query).unwrap_or_else(|rejection| {
        tracing::debug!("ignoring invalid list query: {rejection}");
        ListExpensesQuery::default()
    });

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expenses = list_expenses(&identity.id, query.limit(), &connection)?;

    Ok(Json(json!({ "expenses": expenses })))
}
