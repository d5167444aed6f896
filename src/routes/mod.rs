//! Route table and the stage chain each part of it runs behind.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    authenticate, check_api_key, cors, dispatch, log_request, render_errors, require_admin,
    resolve_group,
};
use crate::state::AppState;

// Room for multipart framing and the text fields next to the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_size() as usize + MULTIPART_OVERHEAD;

    let public_routes = Router::new()
        .route("/config", get(public::get_config))
        .route("/auth/register", post(public::register))
        .route("/auth/login", post(public::login));

    let account_routes = Router::new()
        .route("/user/info", get(protected::user::info))
        .route("/user/groups", get(protected::user::groups));

    let content_routes = Router::new()
        .route(
            "/post/upload",
            post(protected::post::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/post/get", get(protected::post::get))
        .route("/post/getchildren", get(protected::post::children))
        .route("/post/selectlatest", get(protected::post::select_latest))
        .route("/post/find", get(protected::post::find))
        .route("/post/setoptions", post(protected::post::set_options))
        .route("/post/addoptions", post(protected::post::add_options))
        .route("/post/removeoptions", get(protected::post::remove_options))
        .route("/post/remove", get(protected::post::remove))
        .route("/group/create", post(protected::group::create))
        .route("/group/listmembers", get(protected::group::list_members))
        .route("/group/join", post(protected::group::join));

    let admin_routes = Router::new()
        .route("/group/adduser", post(elevated::group::add_user))
        .route("/group/visibility", post(elevated::group::set_visibility))
        .route("/group/remove", post(elevated::group::remove));

    let routes = Router::new()
        .route("/health", get(public::health))
        .merge(public_chain(public_routes, &state))
        .merge(account_chain(account_routes, &state))
        .merge(content_chain(content_routes, &state))
        .merge(admin_chain(admin_routes, &state));

    outer(routes, state)
}

// Layers are listed innermost first; the last route_layer runs first.

/// API key
pub fn public_chain(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn(dispatch))
        .route_layer(from_fn_with_state(state.clone(), check_api_key))
}

/// API key, authentication
pub fn account_chain(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn(dispatch))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route_layer(from_fn_with_state(state.clone(), check_api_key))
}

/// API key, authentication, group resolution
pub fn content_chain(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn(dispatch))
        .route_layer(from_fn_with_state(state.clone(), resolve_group))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route_layer(from_fn_with_state(state.clone(), check_api_key))
}

/// API key, authentication, group resolution, admin check
pub fn admin_chain(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn(dispatch))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), resolve_group))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route_layer(from_fn_with_state(state.clone(), check_api_key))
}

/// Stages every request passes: CORS, timeout, logging, error rendering
pub fn outer(router: Router<AppState>, state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // CORS wraps the timeout so a 408 still carries its headers
    router
        .layer(from_fn_with_state(state.clone(), render_errors))
        .layer(from_fn(log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(from_fn_with_state(state.clone(), cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
