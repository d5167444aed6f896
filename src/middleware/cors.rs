use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::middleware::{advance, Stage};
use crate::state::AppState;

/// Adds the configured `Access-Control-Allow-*` headers to every response; preflights end here
pub async fn cors(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    advance(&mut request, Stage::CorsHandled);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let cors = &state.config.cors;
    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, &cors.allow_origin),
        (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, &cors.allow_credentials),
        (header::ACCESS_CONTROL_ALLOW_METHODS, &cors.allow_methods),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, &cors.allow_headers),
    ];
    for (name, value) in headers {
        set_header(&mut response, name, value);
    }

    response
}

fn set_header(response: &mut Response, name: HeaderName, value: &str) {
    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "invalid CORS header value in configuration"),
    }
}
