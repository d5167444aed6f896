use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::middleware::{advance, reject, Stage};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "api_key";

/// Compares the `API_KEY` header with the configured key; an empty key disables the check
pub async fn check_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = &state.config.security.api_key;

    if !expected.is_empty() {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if provided != expected.as_str() {
            return Err(reject(&request, ApiError::unauthorized("wrong or missing api key")));
        }
    }

    advance(&mut request, Stage::KeyChecked);
    Ok(next.run(request).await)
}
