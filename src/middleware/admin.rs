use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::middleware::{advance, reject, CurrentGroup, CurrentUser, Stage};
use crate::services::authz;

/// Admin subtree gate: needs a resolved group whose admin is the principal
pub async fn require_admin(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>() else {
        return Err(reject(
            &request,
            ApiError::internal_server_error("admin stage mounted without authentication"),
        ));
    };
    let Some(CurrentGroup(group)) = request.extensions().get::<CurrentGroup>() else {
        return Err(reject(&request, ApiError::missing_param("group_uid")));
    };

    if let Err(e) = authz::require_group_admin(user, group) {
        return Err(reject(&request, e));
    }

    advance(&mut request, Stage::AdminVerified);
    Ok(next.run(request).await)
}
