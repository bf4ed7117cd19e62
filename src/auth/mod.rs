//! Authentication through an external identity provider, with the signed-in
//! user kept in an encrypted session cookie.

mod cookie;
mod current_user;
mod identity;
mod log_in;
mod log_out;
mod middleware;
mod provider;
mod session;
mod token;

pub use cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie};
pub use current_user::get_current_user;
pub use identity::{Identity, UserId};
pub use log_in::{CallbackQuery, LogInState, get_callback, get_log_in, get_register};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard};
pub use provider::{IdentityProvider, OAuthIdentityProvider};
pub(crate) use session::COOKIE_SESSION;
pub use session::CookieSession;
pub(crate) use token::Token;

#[cfg(test)]
pub(crate) use session::COOKIE_OAUTH_STATE;
