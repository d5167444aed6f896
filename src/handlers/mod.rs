// handlers/mod.rs - Handler tiers
//
// Public (API key only) -> Protected (token, optional group) -> Elevated (group admin)
pub mod elevated;
pub mod protected;
pub mod public;

use axum::body::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ApiError;

/// `{"unique_id": ...}` returned by every create
#[derive(Debug, Serialize)]
pub struct UidResponse {
    pub unique_id: String,
}

/// Query parameter that must be present and non-empty
pub(crate) fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_param(name))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}

pub(crate) fn parse_limit(value: Option<String>) -> Result<i64, ApiError> {
    let raw = required(value, "limit")?;
    match raw.parse::<i64>() {
        Ok(limit) if limit >= 0 => Ok(limit),
        _ => Err(ApiError::bad_request(format!("limit must be a non-negative integer, got {}", raw))),
    }
}

pub(crate) fn parse_flag(value: &str, name: &str) -> Result<bool, ApiError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ApiError::bad_request(format!("{} must be true or false, got {}", name, other))),
    }
}
