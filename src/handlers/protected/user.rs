use axum::extract::State;

use crate::database::models::{Group, User};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

/// GET /user/info
pub async fn info(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::success(user))
}

/// GET /user/groups - every group the principal is a member of
pub async fn groups(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Vec<Group>> {
    let groups = state.membership().groups_of(&user).await?;
    Ok(ApiResponse::success(groups))
}
