//! A per-request accessor for session values kept in private cookies.
//!
//! Handlers never read cookies directly; they take a [CookieSession] as an
//! extractor and hand it back in the response so that changes are written as
//! `Set-Cookie` headers.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use time::{Duration, OffsetDateTime};

/// The cookie holding the serialized [Token](crate::auth::Token).
pub(crate) const COOKIE_SESSION: &str = "session";
/// The cookie holding the OAuth `state` between the log-in redirect and the callback.
pub(crate) const COOKIE_OAUTH_STATE: &str = "oauth_state";

/// Every cookie that belongs to a session, removed on log out.
const SESSION_COOKIES: [&str; 2] = [COOKIE_SESSION, COOKIE_OAUTH_STATE];

/// Session values stored in encrypted, authenticated cookies.
///
/// Every cookie is `HttpOnly`, `Secure` and `SameSite=Lax`. Lax, not strict,
/// because the identity provider redirects back to the callback from another
/// site and the OAuth state cookie must be sent with that request.
#[derive(Debug, Clone)]
pub struct CookieSession {
    jar: PrivateCookieJar,
}

impl CookieSession {
    /// Wrap a cookie jar.
    pub fn new(jar: PrivateCookieJar) -> Self {
        Self { jar }
    }

    /// Get the value stored under `key`, if any.
    ///
    /// Values removed earlier in the same request are treated as missing.
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.jar
            .get(key)
            .filter(|cookie| {
                cookie
                    .expires_datetime()
                    .is_none_or(|expires| expires > OffsetDateTime::now_utc())
            })
            .map(|cookie| cookie.value().to_owned())
    }

    /// Store `value` under `key` until `expires`.
    pub fn set_item(self, key: &str, value: impl Into<String>, expires: OffsetDateTime) -> Self {
        let cookie = Cookie::build((key.to_owned(), value.into()))
            .path("/")
            .expires(expires)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true);

        Self {
            jar: self.jar.add(cookie),
        }
    }

    /// Set the value under `key` to an invalid value and set its max age to
    /// zero, which should delete the cookie on the client side.
    pub fn remove_item(self, key: &str) -> Self {
        let cookie = Cookie::build((key.to_owned(), "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true);

        Self {
            jar: self.jar.add(cookie),
        }
    }

    /// Remove every session value.
    pub fn destroy(self) -> Self {
        SESSION_COOKIES
            .into_iter()
            .fold(self, |session, key| session.remove_item(key))
    }

    /// The underlying cookie jar.
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar
    }
}

impl<S> FromRequestParts<S> for CookieSession
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_request_parts(parts, state).await?;

        Ok(Self::new(jar))
    }
}

impl IntoResponseParts for CookieSession {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}
