//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};

/// The longest body logged at the `info` level, in bytes.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Headers whose values carry credentials and must never reach the logs.
const REDACTED_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, SET_COOKIE];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level with session
/// cookies redacted. If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes,
/// it is truncated and logged in full at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = read_body(body).await;
    let body_text = String::from_utf8_lossy(&body);

    tracing::info!(
        "Received request: {} {} {:?}",
        parts.method,
        parts.uri,
        redact_headers(&parts.headers)
    );
    log_body("request", &body_text);

    let request = Request::from_parts(parts, Body::from(body.clone()));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body = read_body(body).await;
    let body_text = String::from_utf8_lossy(&body);

    tracing::info!(
        "Sending response: {} {:?}",
        parts.status,
        redact_headers(&parts.headers)
    );
    log_body("response", &body_text);

    Response::from_parts(parts, Body::from(body))
}

async fn read_body(body: Body) -> Bytes {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|error| {
            tracing::warn!("could not read body for logging: {error}");
            Bytes::new()
        })
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    for name in REDACTED_HEADERS {
        let count = headers.get_all(&name).iter().count();
        if count == 0 {
            continue;
        }

        headers.remove(&name);
        for _ in 0..count {
            headers.append(&name, HeaderValue::from_static("********"));
        }
    }

    headers
}

fn log_body(kind: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let end = (0..=LOG_BODY_LENGTH_LIMIT)
            .rev()
            .find(|&index| body.is_char_boundary(index))
            .unwrap_or(0);
        tracing::info!("{kind} body: {}...", &body[..end]);
        tracing::debug!("Full {kind} body: {body:?}");
    } else {
        tracing::info!("{kind} body: {body:?}");
    }
}
