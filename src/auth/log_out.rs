//! Defines the route handler for logging out.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::{CookieSession, log_in::LogInState},
    endpoints,
};

/// Destroy the session and send the browser to the identity provider so that
/// it can end its own session too.
///
/// Falls back to redirecting to the root route if the provider's log-out URL
/// cannot be built, the local session is destroyed either way.
pub async fn get_log_out(State(state): State<LogInState>, session: CookieSession) -> Response {
    let session = session.destroy();

    match state.identity_provider.logout_url() {
        Ok(url) => (session, Redirect::to(url.as_str())).into_response(),
        Err(error) => {
            tracing::error!("could not build the identity provider's log out URL: {error}");
            (session, Redirect::to(endpoints::ROOT)).into_response()
        }
    }
}
