//! This file defines the routes that log a user in or register them through
//! the identity provider, and the callback the provider redirects back to.
//! The auth module handles the lower level session and cookie logic.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::Key;
use serde::Deserialize;
use time::Duration;
use uuid::Uuid;

use crate::{
    AppState, Error,
    auth::{
        CookieSession, IdentityProvider,
        cookie::{set_auth_cookie, set_oauth_state, take_oauth_state},
    },
    endpoints,
};

/// The state needed for logging in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// Who users log in with.
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            identity_provider: state.identity_provider.clone(),
        }
    }
}

impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// Redirect the browser to the identity provider's log-in page.
pub async fn get_log_in(
    State(state): State<LogInState>,
    session: CookieSession,
) -> Result<(CookieSession, Redirect), Error> {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.identity_provider.login_url(&oauth_state)?;

    Ok((
        set_oauth_state(session, &oauth_state),
        Redirect::to(url.as_str()),
    ))
}

/// Redirect the browser to the identity provider's sign-up page.
pub async fn get_register(
    State(state): State<LogInState>,
    session: CookieSession,
) -> Result<(CookieSession, Redirect), Error> {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.identity_provider.register_url(&oauth_state)?;

    Ok((
        set_oauth_state(session, &oauth_state),
        Redirect::to(url.as_str()),
    ))
}

/// The query parameters the identity provider redirects back with.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// The one-time code to exchange for the user's identity.
    pub code: Option<String>,
    /// Must match the state stored in the session before the redirect.
    pub state: Option<String>,
    /// Set by the provider if the user cancelled or the request was bad.
    pub error: Option<String>,
}

/// Finish logging in: check the OAuth state, exchange the code for the user's
/// identity and store it in the session cookie.
///
/// The stored OAuth state is cleared whether or not logging in succeeds.
pub async fn get_callback(
    State(state): State<LogInState>,
    session: CookieSession,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (session, expected_state) = take_oauth_state(session);

    match complete_log_in(&state, session.clone(), expected_state, query).await {
        Ok(session) => (session, Redirect::to(endpoints::ROOT)).into_response(),
        Err(error) => {
            tracing::warn!("log in callback failed: {error}");
            (session, error).into_response()
        }
    }
}

async fn complete_log_in(
    state: &LogInState,
    session: CookieSession,
    expected_state: Option<String>,
    query: CallbackQuery,
) -> Result<CookieSession, Error> {
    if let Some(error) = query.error {
        return Err(Error::IdentityProvider(error));
    }

    match (expected_state, query.state) {
        (Some(expected), Some(actual)) if expected == actual => {}
        _ => return Err(Error::InvalidOAuthState),
    }

    let code = query.code.ok_or(Error::Unauthorized)?;
    let identity = state.identity_provider.exchange_code(&code).await?;
    tracing::info!("user {} logged in", identity.id);

    set_auth_cookie(session, identity, state.cookie_duration)
}
