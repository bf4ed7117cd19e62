//! Application router configuration with protected and unprotected route definitions.

use axum::{Router, middleware, routing::get};

use crate::{
    AppState,
    auth::{auth_guard, get_callback, get_current_user, get_log_in, get_log_out, get_register},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
        get_total_spent_endpoint, list_expenses_endpoint,
    },
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
///
/// Every expense route, and the current user route, sits behind
/// [auth_guard], so requests without a valid session get a 401 before any
/// handler touches the database.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, get(get_log_in))
        .route(endpoints::REGISTER, get(get_register))
        .route(endpoints::AUTH_CALLBACK, get(get_callback))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::EXPENSES,
            get(list_expenses_endpoint).post(create_expense_endpoint),
        )
        .route(endpoints::EXPENSES_TOTAL, get(get_total_spent_endpoint))
        .route(
            endpoints::EXPENSE,
            get(get_expense_endpoint).delete(delete_expense_endpoint),
        )
        .route(endpoints::CURRENT_USER, get(get_current_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}
