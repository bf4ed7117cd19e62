//! The API endpoint URIs, shared by the server router and the client.
//!
//! For endpoints that take a parameter, e.g., '/api/expenses/{expense_id}', use [format_endpoint].

/// The root route, where the browser lands after logging in.
pub const ROOT: &str = "/";

/// The route for listing and creating expenses.
pub const EXPENSES: &str = "/api/expenses";
/// The route for the total amount spent by the signed-in user.
pub const EXPENSES_TOTAL: &str = "/api/expenses/total";
/// The route for getting or deleting a single expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";

/// The route that starts logging in with the identity provider.
pub const LOG_IN: &str = "/api/auth/login";
/// The route that starts creating an account with the identity provider.
pub const REGISTER: &str = "/api/auth/register";
/// The route the identity provider redirects back to after logging in.
pub const AUTH_CALLBACK: &str = "/api/auth/callback";
/// The route for logging out.
pub const LOG_OUT: &str = "/api/auth/logout";
/// The route for getting the signed-in user.
pub const CURRENT_USER: &str = "/api/auth/me";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// Returns `endpoint_path` unchanged if it has no parameter.
///
/// # Examples
///
/// ```
/// use expense_tracker::endpoints::{EXPENSE, format_endpoint};
///
/// assert_eq!(format_endpoint(EXPENSE, 42), "/api/expenses/42");
/// ```
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
