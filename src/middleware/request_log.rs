use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::middleware::{advance, Stage};

// Bodies larger than this are logged by size only
const MAX_LOGGED_BODY: usize = 64 * 1024;

/// Debug-logs the request line, headers, peer and body. Never rejects.
pub async fn log_request(mut request: Request, next: Next) -> Response {
    advance(&mut request, Stage::Logged);

    if !tracing::enabled!(tracing::Level::DEBUG) {
        return next.run(request).await;
    }

    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = format!("{:?}", request.headers());

    if is_multipart(&request) {
        tracing::debug!(%method, %uri, %remote, headers = %headers, file = true, "request");
        return next.run(request).await;
    }

    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if !matches!(declared, Some(len) if len <= MAX_LOGGED_BODY) {
        tracing::debug!(%method, %uri, %remote, headers = %headers, content_length = ?declared, "request");
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Body is gone; the handler sees an empty one
            tracing::warn!(%method, %uri, error = %e, "failed to read request body for logging");
            return next.run(Request::from_parts(parts, Body::empty())).await;
        }
    };

    tracing::debug!(
        %method,
        %uri,
        %remote,
        headers = %headers,
        body = %String::from_utf8_lossy(&bytes),
        "request"
    );

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}
