use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::middleware::{advance, reject, CurrentUser, Stage};
use crate::services::IdentityError;
use crate::state::AppState;

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Validates `X-Auth-Token` and attaches the principal it names as `CurrentUser`
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match request
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
    {
        Some(token) => token.to_string(),
        None => return Err(reject(&request, ApiError::unauthorized("missing X-Auth-Token header"))),
    };

    let claims = auth::validate(&token, &state.config.security.jwt_secret)
        .map_err(|e| reject(&request, e.into()))?;

    // A valid token for a principal we cannot load is our fault, not the client's
    let user = match state.identity().resolve_by_email(&claims.email).await {
        Ok(user) => user,
        Err(IdentityError::NotFound(email)) => {
            return Err(reject(
                &request,
                ApiError::internal_server_error(format!("token names unknown user {}", email)),
            ))
        }
        Err(e) => return Err(reject(&request, e.into())),
    };

    tracing::debug!(user_id = user.id, email = %user.email, "authenticated");
    request.extensions_mut().insert(CurrentUser(user));
    advance(&mut request, Stage::Authenticated);

    Ok(next.run(request).await)
}
