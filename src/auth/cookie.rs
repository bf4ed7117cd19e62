//! Defines functions for keeping the signed-in user's identity in the session cookie.

use std::cmp::max;

use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{
        Identity, Token,
        session::{COOKIE_OAUTH_STATE, COOKIE_SESSION, CookieSession},
    },
};

/// The default duration for which a session is valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::days(7);

/// How long the OAuth state may wait for the identity provider's callback.
pub(crate) const OAUTH_STATE_DURATION: Duration = Duration::minutes(10);

/// Store `identity` in the session, marking the user as signed in.
///
/// Sets the initial expiry of the session to `duration` from the current time.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// # Errors
///
/// Returns an [Error::JSONSerializationError] if the token cannot be serialized.
pub fn set_auth_cookie(
    session: CookieSession,
    identity: Identity,
    duration: Duration,
) -> Result<CookieSession, Error> {
    let expires_at = OffsetDateTime::now_utc() + duration;

    set_token(
        session,
        &Token {
            identity,
            expires_at,
        },
    )
}

fn set_token(session: CookieSession, token: &Token) -> Result<CookieSession, Error> {
    let token_string = serde_json::to_string(token)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(session.set_item(COOKIE_SESSION, token_string, token.expires_at))
}

/// Get the session token, checking that it has not expired.
///
/// # Errors
///
/// Returns an [Error::Unauthorized] if the session cookie is missing, cannot
/// be parsed, or has expired.
pub(crate) fn get_token_from_session(session: &CookieSession) -> Result<Token, Error> {
    let token_string = session
        .get_item(COOKIE_SESSION)
        .ok_or(Error::Unauthorized)?;

    let token: Token = serde_json::from_str(&token_string).map_err(|error| {
        tracing::debug!("could not parse session token: {error}");
        Error::Unauthorized
    })?;

    if token.is_expired(OffsetDateTime::now_utc()) {
        return Err(Error::Unauthorized);
    }

    Ok(token)
}

/// Extend a session that has used up more than half of `duration`.
///
/// The new expiry is UTC now plus `duration`. Sessions with more than half of
/// `duration` left are returned unchanged, so no `Set-Cookie` is sent for
/// them. A session is never shortened.
///
/// # Errors
///
/// The session is not modified if an error is returned.
///
/// Returns:
/// - [Error::Unauthorized] if there is no valid session token,
/// - [Error::InvalidDateFormat] if extending the session by `duration` would overflow the date time.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    session: CookieSession,
    duration: Duration,
) -> Result<CookieSession, Error> {
    let token = get_token_from_session(&session)?;
    let now = OffsetDateTime::now_utc();

    if token.expires_at - now > duration / 2 {
        return Ok(session);
    }

    let new_expiry = now.checked_add(duration).ok_or_else(|| {
        Error::InvalidDateFormat(format!("now + {duration} overflows the date time"))
    })?;

    if new_expiry <= token.expires_at {
        return Ok(session);
    }

    set_token(
        session,
        &Token {
            expires_at: max(token.expires_at, new_expiry),
            ..token
        },
    )
}

/// Remember the OAuth `state` sent to the identity provider.
pub(crate) fn set_oauth_state(session: CookieSession, state: &str) -> CookieSession {
    session.set_item(
        COOKIE_OAUTH_STATE,
        state,
        OffsetDateTime::now_utc() + OAUTH_STATE_DURATION,
    )
}

/// Take the OAuth `state` out of the session so that it can only be used once.
pub(crate) fn take_oauth_state(session: CookieSession) -> (CookieSession, Option<String>) {
    let state = session.get_item(COOKIE_OAUTH_STATE);

    (session.remove_item(COOKIE_OAUTH_STATE), state)
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{
            Identity, Token, UserId,
            cookie::{
                DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
                get_token_from_session, set_auth_cookie, set_oauth_state, set_token,
                take_oauth_state,
            },
            session::{COOKIE_SESSION, CookieSession},
        },
    };

    fn get_session() -> CookieSession {
        let key = Key::from(&Sha512::digest("42"));
        CookieSession::new(PrivateCookieJar::new(key))
    }

    fn identity() -> Identity {
        Identity {
            id: UserId::new("kp_123"),
            given_name: "Grace".to_owned(),
            family_name: "Hopper".to_owned(),
            email: "grace@example.com".to_owned(),
            picture: None,
        }
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {:?}, want {:?}",
            left,
            right
        );
    }

    #[test]
    fn set_then_get_token() {
        let session = set_auth_cookie(get_session(), identity(), DEFAULT_COOKIE_DURATION).unwrap();

        let token = get_token_from_session(&session).unwrap();

        assert_eq!(token.identity, identity());
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
    }

    #[test]
    fn missing_token_is_unauthorized() {
        assert_eq!(
            get_token_from_session(&get_session()),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let session = get_session().set_item(
            COOKIE_SESSION,
            "FOOBAR",
            OffsetDateTime::now_utc() + Duration::minutes(5),
        );

        assert_eq!(get_token_from_session(&session), Err(Error::Unauthorized));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let session = set_token(
            get_session(),
            &Token {
                identity: identity(),
                expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
            },
        )
        .unwrap();

        assert_eq!(get_token_from_session(&session), Err(Error::Unauthorized));
    }

    #[test]
    fn extends_session_that_is_about_to_expire() {
        let session = set_auth_cookie(get_session(), identity(), Duration::seconds(5)).unwrap();

        let session = extend_auth_cookie_duration_if_needed(session, Duration::hours(1)).unwrap();

        let token = get_token_from_session(&session).unwrap();
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + Duration::hours(1),
        );
    }

    #[test]
    fn does_not_shorten_session() {
        let session = set_auth_cookie(get_session(), identity(), Duration::days(1)).unwrap();

        let session = extend_auth_cookie_duration_if_needed(session, Duration::hours(1)).unwrap();

        let token = get_token_from_session(&session).unwrap();
        assert_date_time_close(token.expires_at, OffsetDateTime::now_utc() + Duration::days(1));
    }

    #[test]
    fn keeps_expiry_of_session_with_more_than_half_left() {
        let session = set_auth_cookie(get_session(), identity(), Duration::minutes(40)).unwrap();

        let session = extend_auth_cookie_duration_if_needed(session, Duration::hours(1)).unwrap();

        let token = get_token_from_session(&session).unwrap();
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + Duration::minutes(40),
        );
    }

    #[test]
    fn extends_session_with_less_than_half_left() {
        let session = set_auth_cookie(get_session(), identity(), Duration::minutes(20)).unwrap();

        let session = extend_auth_cookie_duration_if_needed(session, Duration::hours(1)).unwrap();

        let token = get_token_from_session(&session).unwrap();
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + Duration::hours(1),
        );
    }

    #[test]
    fn oauth_state_can_only_be_taken_once() {
        let session = set_oauth_state(get_session(), "abc123");

        let (session, state) = take_oauth_state(session);
        assert_eq!(state.as_deref(), Some("abc123"));

        let (_, state) = take_oauth_state(session);
        assert_eq!(state, None);
    }
}
