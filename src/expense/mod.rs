//! Expense tracking for the signed-in user.
//!
//! This module contains everything related to expenses:
//! - The [ExpenseSchema] shared by the API and the client-side form
//! - The [Expense] model and database functions scoped to the owning user
//! - The JSON route handlers under `/api/expenses`

mod amount;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod get_endpoint;
mod list_endpoint;
mod schema;
mod total_endpoint;

pub use amount::Amount;
pub use core::{
    Expense, MAX_LIST_LIMIT, create_expense, create_expense_table, delete_expense, get_expense,
    list_expenses, map_expense_row, total_spent,
};
pub use create_endpoint::{CreateExpenseState, create_expense_endpoint};
pub use delete_endpoint::{DeleteExpenseState, delete_expense_endpoint};
pub use get_endpoint::{GetExpenseState, get_expense_endpoint};
pub use list_endpoint::{ListExpensesQuery, ListExpensesState, list_expenses_endpoint};
pub use schema::{
    AMOUNT_MAX_DECIMAL_PLACES, AMOUNT_MAX_INTEGER_DIGITS, CreateExpense, ExpenseDate,
    ExpenseSchema, ExpenseTitle, Field, FieldError, NewExpense, TITLE_MAX_LENGTH,
    TITLE_MIN_LENGTH, ValidationErrors, validate_amount, validate_date, validate_title,
};
pub use total_endpoint::{TotalSpentState, get_total_spent_endpoint};

#[cfg(test)]
pub use core::count_expenses;

use crate::{Error, database_id::ExpenseId};

/// Parse the expense ID from a request path.
///
/// Anything that is not an integer cannot name an expense, so it is reported
/// as [Error::NotFound] rather than as a bad request.
fn parse_expense_id(raw_id: &str) -> Result<ExpenseId, Error> {
    raw_id.parse().map_err(|_| Error::NotFound)
}
