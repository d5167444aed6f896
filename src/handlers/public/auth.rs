// handlers/public/auth.rs - POST /auth/register and POST /auth/login

use axum::{body::Bytes, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Claims};
use crate::database::models::User;
use crate::error::ApiError;
use crate::handlers::parse_json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Registration;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub imei: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub name: String,
}

fn token_for(state: &AppState, user: &User) -> Result<TokenResponse, ApiError> {
    let security = &state.config.security;
    let claims = Claims::new(user.email.clone(), security.jwt_expiry_hours);

    Ok(TokenResponse {
        token: auth::issue(&claims, &security.jwt_secret)?,
        name: user.name.clone(),
    })
}

/**
 * POST /auth/register - Create a user and receive a token
 *
 * Expected Input:
 * ```json
 * { "name": "alice", "email": "alice@example.com", "imei": "...", "password": "..." }
 * ```
 *
 * A registered email answers 400.
 */
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<TokenResponse> {
    let request: RegisterRequest = parse_json(&body)?;
    if request.name.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("name, email and password are required"));
    }
    tracing::info!(name = %request.name, "registration attempt");

    let user = state
        .identity()
        .register(Registration {
            name: request.name,
            email: request.email,
            imei: request.imei,
            password: request.password,
        })
        .await?;

    Ok(ApiResponse::success(token_for(&state, &user)?))
}

/// POST /auth/login - Verify credentials; unknown email and wrong password both answer 401
pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<TokenResponse> {
    let request: LoginRequest = parse_json(&body)?;
    tracing::info!(email = %request.email, "login attempt");

    let user = state
        .identity()
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(ApiResponse::success(token_for(&state, &user)?))
}
