//! Authorization decisions shared by the admin stage and the handlers.

use crate::database::manager::DatabaseError;
use crate::database::models::{Group, Post, User};
use crate::error::ApiError;
use crate::services::membership::MembershipResolver;

pub fn require_post_owner(user: &User, post: &Post) -> Result<(), ApiError> {
    if post.user_id != user.id {
        return Err(ApiError::unauthorized(format!(
            "user {} does not own post {}",
            user.id, post.unique_id
        )));
    }
    Ok(())
}

pub fn require_group_admin(user: &User, group: &Group) -> Result<(), ApiError> {
    if group.admin_id != user.id {
        return Err(ApiError::unauthorized(format!(
            "user {} is not admin of group {}",
            user.id, group.unique_id
        )));
    }
    Ok(())
}

/// Operations on another principal may not target the requester
pub fn require_not_self(user: &User, target: &User) -> Result<(), ApiError> {
    if user.id == target.id {
        return Err(ApiError::bad_request("cannot target yourself"));
    }
    Ok(())
}

/// Whether `user` may see a resource owned by `group`; ungrouped resources are open
pub async fn can_view_group(
    user: &User,
    group: Option<&Group>,
    membership: &MembershipResolver,
) -> Result<bool, DatabaseError> {
    match group {
        None => Ok(true),
        Some(group) => membership.can_view(user, group).await,
    }
}
