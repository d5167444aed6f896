use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::config::AppConfig;
use crate::error::ErrorMessage;
use crate::state::AppState;

// Framework rejections carry a short plain-text reason
const REJECTION_BODY_LIMIT: usize = 4 * 1024;

/// Turns every error response from the stages and handlers below into its final form
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;
    let status = response.status();
    let message = match response.extensions_mut().remove::<ErrorMessage>() {
        Some(ErrorMessage(message)) => message,
        None if is_rejection(&response) => rejection_text(response).await,
        None => return response,
    };

    if status.is_server_error() {
        tracing::error!(%method, %uri, status = status.as_u16(), "{}", message);
    } else {
        tracing::info!(%method, %uri, status = status.as_u16(), "{}", message);
    }

    render(&state.config, status, &message, &uri)
}

/// Error status with an empty or plain-text body, as axum's own rejections produce
fn is_rejection(response: &Response) -> bool {
    let status = response.status();
    let plain = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(true, |value| value.starts_with("text/plain"));

    (status.is_client_error() || status.is_server_error()) && plain
}

/// Reason of an error response that did not come from an `ApiError`
async fn rejection_text(response: Response) -> String {
    let status = response.status();
    let text = to_bytes(response.into_body(), REJECTION_BODY_LIMIT)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        text
    }
}

/// Debug builds a `{"message", "url"}` body; production sends the bare status
pub fn render(config: &AppConfig, status: StatusCode, message: &str, uri: &Uri) -> Response {
    if config.is_debug() {
        let body = json!({
            "message": message,
            "url": uri.to_string(),
        });
        (status, Json(body)).into_response()
    } else {
        status.into_response()
    }
}
