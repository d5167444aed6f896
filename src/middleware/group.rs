use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{advance, reject, ApiQuery, CurrentGroup, CurrentUser, Stage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GroupParam {
    pub group_uid: Option<String>,
}

/// Resolves `group_uid` into `CurrentGroup`; private groups admit members only
pub async fn resolve_group(
    State(state): State<AppState>,
    ApiQuery(param): ApiQuery<GroupParam>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let group_uid = match param.group_uid.filter(|uid| !uid.is_empty()) {
        Some(uid) => uid,
        None => return Ok(next.run(request).await),
    };

    let user = match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) => user.clone(),
        None => {
            return Err(reject(
                &request,
                ApiError::internal_server_error("group stage mounted without authentication"),
            ))
        }
    };

    let group = match state.groups.get_by_unique_id(&group_uid).await {
        Ok(Some(group)) => group,
        Ok(None) => {
            return Err(reject(
                &request,
                ApiError::not_found(format!("group {} does not exist", group_uid)),
            ))
        }
        Err(e) => return Err(reject(&request, e.into())),
    };

    let visible = state
        .membership()
        .can_view(&user, &group)
        .await
        .map_err(|e| reject(&request, e.into()))?;
    if !visible {
        return Err(reject(
            &request,
            ApiError::unauthorized(format!("user {} is not a member of group {}", user.id, group.unique_id)),
        ));
    }

    tracing::debug!(group_uid = %group.unique_id, public = group.public, "group resolved");
    request.extensions_mut().insert(CurrentGroup(group));
    advance(&mut request, Stage::GroupResolved);

    Ok(next.run(request).await)
}
