//! Defines the core data model and database queries for expenses.
//!
//! Every query takes the owner's [UserId] and filters on it, so one user can
//! never read or delete another user's expenses.

use rusqlite::{Connection, Row, named_params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserId,
    database_id::ExpenseId,
    expense::{Amount, ExpenseDate, ExpenseTitle, NewExpense},
};

// ============================================================================
// MODELS
// ============================================================================

/// Money spent by a user on something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// What the money was spent on.
    pub title: ExpenseTitle,
    /// How much was spent.
    pub amount: Amount,
    /// When the money was spent.
    pub date: ExpenseDate,
    /// When the expense was recorded by the server.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// The user that owns the expense.
    pub user_id: UserId,
}

/// The most expenses returned by [list_expenses].
pub const MAX_LIST_LIMIT: u32 = 100;

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert a validated expense owned by `user_id`.
///
/// The creation time is set to the current time.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_expense(
    expense: NewExpense,
    user_id: &UserId,
    connection: &Connection,
) -> Result<Expense, Error> {
    create_expense_at(expense, user_id, OffsetDateTime::now_utc(), connection)
}

/// Insert a validated expense owned by `user_id` with an explicit creation time.
fn create_expense_at(
    expense: NewExpense,
    user_id: &UserId,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "INSERT INTO expense (title, amount, date, created_at, user_id)
             VALUES (:title, :amount, :date, :created_at, :user_id)
             RETURNING id, title, amount, date, created_at, user_id",
        )?
        .query_row(
            named_params! {
                ":title": expense.title.as_ref(),
                ":amount": expense.amount,
                ":date": expense.date.as_offset_date_time(),
                ":created_at": created_at,
                ":user_id": user_id.as_str(),
            },
            map_expense_row,
        )?;

    Ok(expense)
}

/// Retrieve the expense `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not exist or belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(
    id: ExpenseId,
    user_id: &UserId,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT id, title, amount, date, created_at, user_id FROM expense
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            named_params! { ":id": id, ":user_id": user_id.as_str() },
            map_expense_row,
        )?;

    Ok(expense)
}

/// Get the most recently created expenses owned by `user_id`, newest first.
///
/// `limit` is clamped to between 1 and [MAX_LIST_LIMIT].
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_expenses(
    user_id: &UserId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);

    let mut statement = connection.prepare(
        "SELECT id, title, amount, date, created_at, user_id FROM expense
         WHERE user_id = :user_id
         ORDER BY created_at DESC, id DESC
         LIMIT :limit",
    )?;

    let expenses = statement
        .query_map(
            named_params! { ":user_id": user_id.as_str(), ":limit": limit },
            map_expense_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

/// Delete the expense `id` owned by `user_id` and return it.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not exist or belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_expense(
    id: ExpenseId,
    user_id: &UserId,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "DELETE FROM expense WHERE id = :id AND user_id = :user_id
             RETURNING id, title, amount, date, created_at, user_id",
        )?
        .query_row(
            named_params! { ":id": id, ":user_id": user_id.as_str() },
            map_expense_row,
        )?;

    Ok(expense)
}

/// Sum the amounts of every expense owned by `user_id`.
///
/// Returns [Amount::ZERO] if the user has no expenses.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// including when the sum overflows.
pub fn total_spent(user_id: &UserId, connection: &Connection) -> Result<Amount, Error> {
    // Amounts are stored with exactly two decimal places, so dropping the
    // decimal point gives the amount in cents and the sum stays exact.
    let cents: i64 = connection.query_row(
        "SELECT COALESCE(SUM(CAST(REPLACE(amount, '.', '') AS INTEGER)), 0)
         FROM expense WHERE user_id = :user_id",
        named_params! { ":user_id": user_id.as_str() },
        |row| row.get(0),
    )?;

    Ok(Amount::from_cents(cents))
}

/// Get the number of expenses owned by `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_expenses(user_id: &UserId, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM expense WHERE user_id = :user_id",
            named_params! { ":user_id": user_id.as_str() },
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                user_id TEXT NOT NULL
                )",
        (),
    )?;

    // Every query filters by owner, and the list is ordered by creation time.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_user_created_at ON expense(user_id, created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Expense.
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_title: String = row.get(1)?;
    let amount = row.get(2)?;
    let date: OffsetDateTime = row.get(3)?;
    let created_at = row.get(4)?;
    let raw_user_id: String = row.get(5)?;

    Ok(Expense {
        id,
        title: ExpenseTitle::new_unchecked(&raw_title),
        amount,
        date: ExpenseDate::new(date),
        created_at,
        user_id: UserId::new(&raw_user_id),
    })
}

// ============================================================================
// TESTS
// ============================================================================
