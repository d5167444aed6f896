use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::database::models::{NewGroup, User};
use crate::error::ApiError;
use crate::handlers::{parse_flag, required, UidResponse};
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, CurrentGroup, CurrentUser};
use crate::services::uid;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGroupQuery {
    pub title: Option<String>,
    pub public: Option<String>,
}

/// POST /group/create?title[&public] - the requester becomes admin and first member
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<CreateGroupQuery>,
) -> ApiResult<UidResponse> {
    let title = required(query.title, "title")?;
    let public = match query.public.as_deref() {
        Some(flag) => parse_flag(flag, "public")?,
        None => false,
    };

    let group = uid::insert_with_unique_id(&state.uid_policy, |unique_id| {
        let groups = state.groups.clone();
        let new_group = NewGroup {
            unique_id,
            title: title.clone(),
            admin_id: user.id,
            public,
        };
        async move { groups.persist(new_group).await }
    })
    .await?;

    tracing::info!(group_uid = %group.unique_id, admin = user.id, public, "group created");
    Ok(ApiResponse::success(UidResponse {
        unique_id: group.unique_id,
    }))
}

/// GET /group/listmembers?group_uid - visibility was settled by the group stage
pub async fn list_members(
    State(state): State<AppState>,
    CurrentGroup(group): CurrentGroup,
) -> ApiResult<Vec<User>> {
    let members = state.membership().members_of(&group).await?;
    Ok(ApiResponse::success(members))
}

/// POST /group/join?group_uid - join a public group
pub async fn join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    CurrentGroup(group): CurrentGroup,
) -> Result<StatusCode, ApiError> {
    if !group.public {
        return Err(ApiError::unauthorized(format!(
            "group {} is private, ask its admin to be added",
            group.unique_id
        )));
    }

    state.membership().add_member(&user, &group).await?;
    tracing::info!(user_id = user.id, group_uid = %group.unique_id, "joined group");
    Ok(StatusCode::OK)
}
