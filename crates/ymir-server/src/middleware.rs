//! Request logging middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Log one line per request, at a level chosen by status class.
///
/// Only the path is recorded; the callback's query string carries the
/// authorization code.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        500.. => tracing::error!(%method, %path, status, elapsed_ms, "request failed"),
        400..=499 => tracing::warn!(%method, %path, status, elapsed_ms, "request rejected"),
        _ => tracing::info!(%method, %path, status, elapsed_ms, "request"),
    }

    response
}
