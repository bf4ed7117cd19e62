use std::{
    env,
    error::Error,
    fs::OpenOptions,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use reqwest::Url;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppState, AuthConfig, OAuthIdentityProvider, build_router, graceful_shutdown,
    logging_middleware,
};

/// The REST API server for expense_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: String,

    /// The address to serve the API from.
    #[arg(short, long, env = "ADDRESS", default_value = "127.0.0.1")]
    address: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The identity provider's base URL, e.g. "https://example.kinde.com".
    #[arg(long, env = "AUTH_DOMAIN")]
    auth_domain: Url,

    /// The OAuth client ID issued by the identity provider.
    #[arg(long, env = "AUTH_CLIENT_ID")]
    auth_client_id: String,

    /// The OAuth client secret issued by the identity provider.
    #[arg(long, env = "AUTH_CLIENT_SECRET", hide_env_values = true)]
    auth_client_secret: String,

    /// Where the identity provider sends users after logging in.
    #[arg(long, env = "AUTH_REDIRECT_URL")]
    auth_redirect_url: Url,

    /// Where the identity provider sends users after logging out.
    #[arg(long, env = "AUTH_LOGOUT_REDIRECT_URL")]
    auth_logout_redirect_url: Url,

    /// Log every request and response, with session cookies redacted.
    #[arg(long, env = "LOG_REQUESTS")]
    log_requests: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging()?;

    let args = Args::parse();

    let addr = SocketAddr::from((args.address, args.port));

    let secret = env::var("SECRET").map_err(|_| "The environment variable 'SECRET' must be set")?;

    let identity_provider = OAuthIdentityProvider::new(AuthConfig {
        domain: args.auth_domain,
        client_id: args.auth_client_id,
        client_secret: args.auth_client_secret,
        redirect_url: args.auth_redirect_url,
        logout_redirect_url: args.auth_logout_redirect_url,
    })?;

    let connection = Connection::open(&args.db_path)?;
    let app_state = AppState::new(connection, &secret, Arc::new(identity_provider))?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(app_state);
    let router = if args.log_requests {
        router.layer(middleware::from_fn(logging_middleware))
    } else {
        router
    };
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

fn setup_logging() -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
