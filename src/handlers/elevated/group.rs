// handlers/elevated/group.rs - group administration
//
// Mounted behind the admin stage, so the principal here is always the admin
// of `CurrentGroup`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::{parse_flag, parse_json, required};
use crate::middleware::{ApiQuery, CurrentGroup, CurrentUser};
use crate::services::authz;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityQuery {
    pub public: Option<String>,
}

/// POST /group/adduser?group_uid with `{"email": ...}`
pub async fn add_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    CurrentGroup(group): CurrentGroup,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: AddUserRequest = parse_json(&body)?;

    let target = state
        .users
        .get_by_email(&request.email)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("no user with email {}", request.email)))?;
    authz::require_not_self(&admin, &target)?;

    let membership = state.membership();
    if membership.is_member(&target, &group).await? {
        return Err(ApiError::bad_request(format!(
            "user is already member of group {}",
            group.title
        )));
    }

    membership.add_member(&target, &group).await?;
    tracing::info!(user_id = target.id, group_uid = %group.unique_id, "added user to group");
    Ok(StatusCode::OK)
}

/// POST /group/visibility?group_uid&public
pub async fn set_visibility(
    State(state): State<AppState>,
    CurrentGroup(group): CurrentGroup,
    ApiQuery(query): ApiQuery<VisibilityQuery>,
) -> Result<StatusCode, ApiError> {
    let public = parse_flag(&required(query.public, "public")?, "public")?;

    state.groups.update_visibility(&group, public).await?;
    tracing::info!(group_uid = %group.unique_id, public, "group visibility changed");
    Ok(StatusCode::OK)
}

/// POST /group/remove?group_uid - memberships and posts go with the group
pub async fn remove(
    State(state): State<AppState>,
    CurrentGroup(group): CurrentGroup,
) -> Result<StatusCode, ApiError> {
    state.groups.remove(&group).await?;
    tracing::info!(group_uid = %group.unique_id, "group removed");
    Ok(StatusCode::OK)
}
