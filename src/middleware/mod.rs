//! Request pipeline stages.
//!
//! Outer to inner: CORS, request timeout, request logging, error rendering, API key,
//! authentication, group resolution, admin check. Each stage either rejects
//! with an `ApiError` or adds typed context for the stages after it.

pub mod admin;
pub mod api_key;
pub mod auth;
pub mod context;
pub mod cors;
pub mod errors;
pub mod group;
pub mod request_log;
pub mod response;

use axum::extract::Request;
use std::fmt;

use crate::error::ApiError;

pub use admin::require_admin;
pub use api_key::check_api_key;
pub use auth::{authenticate, AUTH_TOKEN_HEADER};
pub use context::{ApiMultipart, ApiQuery, CurrentGroup, CurrentUser};
pub use cors::cors;
pub use errors::render_errors;
pub use group::resolve_group;
pub use request_log::log_request;
pub use response::{ApiResponse, ApiResult};

/// How far a request has travelled through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Entering,
    CorsHandled,
    Logged,
    KeyChecked,
    Authenticated,
    GroupResolved,
    AdminVerified,
    HandlerDispatched,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Entering => "entering",
            Stage::CorsHandled => "cors_handled",
            Stage::Logged => "logged",
            Stage::KeyChecked => "key_checked",
            Stage::Authenticated => "authenticated",
            Stage::GroupResolved => "group_resolved",
            Stage::AdminVerified => "admin_verified",
            Stage::HandlerDispatched => "handler_dispatched",
        };
        f.write_str(name)
    }
}

pub fn reached(request: &Request) -> Stage {
    request
        .extensions()
        .get::<Stage>()
        .copied()
        .unwrap_or(Stage::Entering)
}

/// Stages only move forward
pub(crate) fn advance(request: &mut Request, stage: Stage) {
    debug_assert!(reached(request) <= stage, "stage {} after {}", stage, reached(request));
    request.extensions_mut().insert(stage);
}

/// Log a stage rejection with the last stage the request got past
pub(crate) fn reject(request: &Request, error: ApiError) -> ApiError {
    tracing::warn!(
        reached = %reached(request),
        method = %request.method(),
        uri = %request.uri(),
        status = error.status().as_u16(),
        "rejected: {}",
        error.message()
    );
    error
}

/// Innermost layer; marks the hand-over to the route handler
pub async fn dispatch(mut request: Request, next: axum::middleware::Next) -> axum::response::Response {
    advance(&mut request, Stage::HandlerDispatched);
    tracing::trace!(uri = %request.uri(), "dispatching handler");
    next.run(request).await
}
