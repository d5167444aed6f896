use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::database::models::{Group, User};
use crate::error::ApiError;

/// Principal resolved by the authentication stage
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Group resolved from `group_uid` by the group stage
#[derive(Debug, Clone)]
pub struct CurrentGroup(pub Group);

// A missing extension means the route was mounted without its stage
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::internal_server_error("no authenticated user on request"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentGroup
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentGroup>()
            .cloned()
            .ok_or_else(|| ApiError::bad_request("missing parameter group_uid in request"))
    }
}

/// `Query` that rejects with an `ApiError`
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// `Multipart` that rejects with an `ApiError`
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(ApiMultipart(Multipart::from_request(request, state).await?))
    }
}
