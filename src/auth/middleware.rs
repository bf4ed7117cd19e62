//! Authentication middleware that validates the session cookie and extends sessions.

use axum::{
    extract::{FromRef, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_session},
        session::CookieSession,
    },
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The [Identity](crate::auth::Identity) is placed into the request and the
/// request executed normally if the cookie is valid, otherwise a 401 JSON
/// response is returned before the handler runs.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(identity): Extension<Identity>` to receive the signed-in user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
    let session = CookieSession::new(jar);

    let identity = match get_token_from_session(&session) {
        Ok(token) => token.identity,
        Err(error) => return error.into_response(),
    };

    tracing::debug!("request from user {}", identity.id);
    parts.extensions.insert(identity);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let session = match extend_auth_cookie_duration_if_needed(session.clone(), state.cookie_duration)
    {
        Ok(updated_session) => updated_session,
        Err(Error::Unauthorized) => session,
        Err(error) => {
            tracing::error!("Error extending cookie duration: {error:?}. Rolling back session.");
            session
        }
    };
    for (key, val) in session.into_jar().into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}
