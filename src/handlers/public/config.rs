use axum::extract::State;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Upload limits and media locations clients need before uploading
#[derive(Debug, Serialize)]
pub struct ClientConfig {
    pub max_image_size: u64,
    pub max_video_size: u64,
    pub image_path: String,
    pub video_path: String,
}

/// GET /config
pub async fn get_config(State(state): State<AppState>) -> ApiResult<ClientConfig> {
    let media = &state.config.media;

    Ok(ApiResponse::success(ClientConfig {
        max_image_size: media.max_image_size,
        max_video_size: media.max_video_size,
        image_path: media.image_path.clone(),
        video_path: media.video_path.clone(),
    }))
}
