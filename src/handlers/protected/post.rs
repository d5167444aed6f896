// handlers/protected/post.rs - /post/* handlers
//
// Posts inside a group are reached through that group's visibility: feeds
// and searches take the group from the group stage, single posts are checked
// against the group they belong to.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::database::models::{NewPost, Post, PostMethod, PostOption, PostType, User};
use crate::error::ApiError;
use crate::handlers::{parse_json, parse_limit, required, UidResponse};
use crate::middleware::{ApiMultipart, ApiQuery, ApiResponse, ApiResult, CurrentGroup, CurrentUser};
use crate::services::{authz, uid};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub uid: Option<String>,
    pub post_uid: Option<String>,
    pub parent_uid: Option<String>,
    pub limit: Option<String>,
    pub title: Option<String>,
}

struct UploadedFile {
    content_type: String,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    parent_uid: Option<String>,
    method: Option<String>,
    post_type: Option<String>,
    file: Option<UploadedFile>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {}", e)))?;
                form.file = Some(UploadedFile { content_type, bytes });
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read field {}: {}", name, e)))?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "parent_uid" => form.parent_uid = Some(value),
                "method" => form.method = Some(value),
                "type" => form.post_type = Some(value),
                other => tracing::debug!(field = other, "ignoring unknown upload field"),
            }
        }

        Ok(form)
    }
}

fn parse_code(value: Option<String>, name: &str) -> Result<i32, ApiError> {
    let raw = required(value, name)?;
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("{} must be an integer, got {}", name, raw)))
}

async fn load_post(state: &AppState, unique_id: &str) -> Result<Post, ApiError> {
    state
        .posts
        .get_by_unique_id(unique_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("post {} does not exist", unique_id)))
}

/// Posts of private groups are only shown to members
async fn ensure_visible(state: &AppState, user: &User, post: &Post) -> Result<(), ApiError> {
    let group = match post.group_id {
        Some(id) => state.groups.get_by_id(id).await?,
        None => None,
    };

    if !authz::can_view_group(user, group.as_ref(), &state.membership()).await? {
        return Err(ApiError::unauthorized(format!(
            "post {} belongs to a group user {} cannot see",
            post.unique_id, user.id
        )));
    }
    Ok(())
}

/**
 * POST /post/upload - multipart form with `title`, `type`, `method`, `file`
 * and an optional `parent_uid`
 *
 * `type` is 0 (image) or 1 (video), `method` is 0..=3. Both are checked
 * before anything is written, then the file size against the limit of its
 * type. The post lands in the group named by `group_uid`, if any.
 */
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    group: Option<CurrentGroup>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<UidResponse> {
    let form = UploadForm::read(&mut multipart).await?;

    let title = required(form.title, "title")?;
    let post_type = PostType::try_from(parse_code(form.post_type, "type")?)
        .map_err(|t| ApiError::bad_request(format!("wrong type {} for post", t)))?;
    let method = PostMethod::try_from(parse_code(form.method, "method")?)
        .map_err(|m| ApiError::bad_request(format!("wrong method {} for post", m)))?;
    let file = form.file.ok_or_else(|| ApiError::missing_param("file"))?;

    let media = &state.config.media;
    let limit = match post_type {
        PostType::Image => media.max_image_size,
        PostType::Video => media.max_video_size,
    };
    if file.bytes.len() as u64 > limit {
        return Err(ApiError::bad_request(format!(
            "file of {} bytes exceeds the limit of {} bytes",
            file.bytes.len(),
            limit
        )));
    }

    let parent_id = match form.parent_uid.filter(|uid| !uid.is_empty()) {
        Some(parent_uid) => {
            let parent = load_post(&state, &parent_uid).await?;
            ensure_visible(&state, &user, &parent).await?;
            Some(parent.id)
        }
        None => None,
    };
    let group_id = group.map(|CurrentGroup(group)| group.id);

    tracing::info!(title = %title, user = %user.name, "uploading post");
    let path = state.files.store(post_type, &file.content_type, &file.bytes).await?;

    let inserted = uid::insert_with_unique_id(&state.uid_policy, |unique_id| {
        let posts = state.posts.clone();
        let new_post = NewPost {
            unique_id,
            title: title.clone(),
            user_id: user.id,
            path: path.clone(),
            parent_id,
            group_id,
            method,
            post_type,
        };
        async move { posts.persist(new_post).await }
    })
    .await;

    let post = match inserted {
        Ok(post) => post,
        Err(e) => {
            // No post refers to the file
            if let Err(cleanup) = state.files.remove(post_type, &path).await {
                tracing::warn!(path = %path, "failed to remove orphaned upload: {}", cleanup);
            }
            return Err(e.into());
        }
    };

    tracing::info!(uid = %post.unique_id, title = %post.title, "post uploaded");
    Ok(ApiResponse::success(UidResponse {
        unique_id: post.unique_id,
    }))
}

/// GET /post/get?uid
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> ApiResult<Post> {
    let uid = required(query.uid, "uid")?;
    let post = load_post(&state, &uid).await?;
    ensure_visible(&state, &user, &post).await?;

    tracing::info!(uid = %post.unique_id, title = %post.title, "fetching post");
    Ok(ApiResponse::success(post))
}

/// GET /post/getchildren?parent_uid
pub async fn children(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> ApiResult<Vec<Post>> {
    let parent_uid = required(query.parent_uid, "parent_uid")?;
    let parent = load_post(&state, &parent_uid).await?;
    ensure_visible(&state, &user, &parent).await?;

    let posts = state.posts.children_of(&parent).await?;
    tracing::info!(parent = %parent_uid, children = posts.len(), "fetching child posts");
    Ok(ApiResponse::success(posts))
}

/// GET /post/selectlatest?limit[&group_uid]
pub async fn select_latest(
    State(state): State<AppState>,
    group: Option<CurrentGroup>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> ApiResult<Vec<Post>> {
    let limit = parse_limit(query.limit)?;

    let posts = match group {
        Some(CurrentGroup(group)) => state.posts.latest_in_group(&group, limit).await?,
        None => state.posts.latest(limit).await?,
    };
    Ok(ApiResponse::success(posts))
}

/// GET /post/find?title&limit[&group_uid]
pub async fn find(
    State(state): State<AppState>,
    group: Option<CurrentGroup>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> ApiResult<Vec<Post>> {
    let limit = parse_limit(query.limit)?;
    let title = query.title.unwrap_or_default();

    let posts = match group {
        Some(CurrentGroup(group)) => {
            state.posts.find_by_title_in_group(&title, &group, limit).await?
        }
        None => state.posts.find_by_title(&title, limit).await?,
    };
    tracing::debug!(title = %title, found = posts.len(), "searched posts by title");
    Ok(ApiResponse::success(posts))
}

async fn owned_post(state: &AppState, user: &User, uid: Option<String>, name: &str) -> Result<Post, ApiError> {
    let uid = required(uid, name)?;
    let post = load_post(state, &uid).await?;
    authz::require_post_owner(user, &post)?;
    Ok(post)
}

fn options_for(post: &Post, body: &Bytes) -> Result<Vec<PostOption>, ApiError> {
    let options: Vec<PostOption> = parse_json(body)?;
    Ok(options
        .into_iter()
        .map(|option| PostOption {
            post_uid: post.unique_id.clone(),
            ..option
        })
        .collect())
}

/// POST /post/setoptions?post_uid - replace all options with the body's list
pub async fn set_options(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let post = owned_post(&state, &user, query.post_uid, "post_uid").await?;
    let options = options_for(&post, &body)?;

    state.posts.set_options(&post, &options).await?;
    Ok(StatusCode::OK)
}

/// POST /post/addoptions?post_uid
pub async fn add_options(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let post = owned_post(&state, &user, query.post_uid, "post_uid").await?;
    let options = options_for(&post, &body)?;

    state.posts.add_options(&post, &options).await?;
    Ok(StatusCode::OK)
}

/// GET /post/removeoptions?uid
pub async fn remove_options(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> Result<StatusCode, ApiError> {
    let post = owned_post(&state, &user, query.uid, "uid").await?;

    state.posts.remove_options(&post).await?;
    Ok(StatusCode::OK)
}

/// GET /post/remove?uid - the post goes together with its options and children
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> Result<StatusCode, ApiError> {
    let post = owned_post(&state, &user, query.uid, "uid").await?;

    state.posts.remove(&post).await?;
    tracing::info!(uid = %post.unique_id, "post removed");
    Ok(StatusCode::OK)
}
