//! An expense tracker: a JSON API for recording what you spend, and the
//! client-side data and form layers that talk to it.
//!
//! Users log in through an external identity provider. Every expense belongs
//! to the user that created it, and every query is scoped to the signed-in
//! user, so users never see each other's expenses.
//!
//! The server side is [build_router], which serves:
//! - `/api/expenses`: list, create, get, delete and total expenses,
//! - `/api/auth`: log in, register, log out and get the current user.
//!
//! The client side is [client], which caches query results, applies
//! optimistic updates, and drives the "new expense" form using the same
//! [ExpenseSchema](expense::ExpenseSchema) as the server.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
pub mod client;
mod config;
mod database_id;
mod db;
pub mod endpoints;
mod error;
pub mod expense;
mod logging;
mod not_found;
mod routing;
#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, create_cookie_key};
pub use auth::{
    CookieSession, DEFAULT_COOKIE_DURATION, Identity, IdentityProvider, OAuthIdentityProvider,
    UserId,
};
pub use config::AuthConfig;
pub use database_id::ExpenseId;
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
