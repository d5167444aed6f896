//! In-memory repositories and request helpers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use tower::ServiceExt;

use crate::auth::{self, Claims};
use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Group, NewGroup, NewPost, NewUser, Post, PostOption, PostType, User};
use crate::database::repository::{GroupRepository, PostRepository, UniquenessOracle, UserRepository};
use crate::services::{FileStore, RetryPolicy, StorageError};
use crate::state::AppState;

pub fn sample_user(id: i32, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name),
        imei: format!("imei-{}", id),
        password: String::new(),
    }
}

pub fn sample_post(id: i32, unique_id: &str, owner: &User) -> Post {
    Post {
        id,
        unique_id: unique_id.to_string(),
        title: format!("post {}", id),
        user_id: owner.id,
        path: format!("{}.png", unique_id),
        parent_id: None,
        group_id: None,
        method: 0,
        post_type: 0,
        created_at: Utc::now(),
        options: Vec::new(),
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

impl MemoryUsers {
    fn by_id(&self, id: i32) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    /// Insert a user without a password
    pub fn add(&self, name: &str) -> User {
        let mut users = self.users.lock().unwrap();
        let user = sample_user(users.len() as i32 + 1, name);
        users.push(user.clone());
        user
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn get_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.name == name).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn persist(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }

        let user = User {
            id: users.len() as i32 + 1,
            name: user.name,
            email: user.email,
            imei: user.imei,
            password: user.password,
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
struct GroupTables {
    groups: Vec<Group>,
    members: Vec<(i32, User)>,
}

/// Memberships keep user snapshots; `users` supplies them for admins of persisted groups
#[derive(Default)]
pub struct MemoryGroups {
    tables: Mutex<GroupTables>,
    users: Arc<MemoryUsers>,
}

impl MemoryGroups {
    pub fn new(users: Arc<MemoryUsers>) -> Self {
        Self {
            tables: Mutex::default(),
            users,
        }
    }

    pub fn create(&self, title: &str, admin: &User, public: bool) -> Group {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.groups.len() as i32 + 1;
        let group = Group {
            id,
            unique_id: format!("group-{}", id),
            title: title.to_string(),
            admin_id: admin.id,
            public,
        };
        tables.groups.push(group.clone());
        tables.members.push((id, admin.clone()));
        group
    }
}

#[async_trait]
impl UniquenessOracle for MemoryGroups {
    async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.groups.iter().any(|g| g.unique_id == unique_id))
    }
}

#[async_trait]
impl GroupRepository for MemoryGroups {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Group>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.groups.iter().find(|g| g.unique_id == unique_id).cloned())
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Group>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn persist(&self, group: NewGroup) -> Result<Group, DatabaseError> {
        let admin = self
            .users
            .by_id(group.admin_id)
            .unwrap_or_else(|| sample_user(group.admin_id, "admin"));
        let mut tables = self.tables.lock().unwrap();
        if tables.groups.iter().any(|g| g.unique_id == group.unique_id) {
            return Err(DatabaseError::UniqueViolation("groups_unique_id_key".to_string()));
        }

        let group = Group {
            id: tables.groups.len() as i32 + 1,
            unique_id: group.unique_id,
            title: group.title,
            admin_id: group.admin_id,
            public: group.public,
        };
        tables.groups.push(group.clone());
        tables.members.push((group.id, admin));
        Ok(group)
    }

    async fn add_member(&self, user: &User, group: &Group) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.members.iter().any(|(g, u)| *g == group.id && u.id == user.id) {
            tables.members.push((group.id, user.clone()));
        }
        Ok(())
    }

    async fn is_member(&self, user: &User, group: &Group) -> Result<bool, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.members.iter().any(|(g, u)| *g == group.id && u.id == user.id))
    }

    async fn members_of(&self, group: &Group) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .members
            .iter()
            .filter(|(g, _)| *g == group.id)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn groups_of(&self, user: &User) -> Result<Vec<Group>, DatabaseError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .groups
            .iter()
            .filter(|g| tables.members.iter().any(|(id, u)| *id == g.id && u.id == user.id))
            .cloned()
            .collect())
    }

    async fn update_visibility(&self, group: &Group, public: bool) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(stored) = tables.groups.iter_mut().find(|g| g.id == group.id) {
            stored.public = public;
        }
        Ok(())
    }

    async fn remove(&self, group: &Group) -> Result<(), DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        tables.groups.retain(|g| g.id != group.id);
        tables.members.retain(|(g, _)| *g != group.id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPosts {
    posts: Mutex<Vec<Post>>,
}

impl MemoryPosts {
    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    fn newest_first(mut posts: Vec<Post>, limit: i64) -> Vec<Post> {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts.truncate(limit.max(0) as usize);
        posts
    }

    fn top_level(&self, group_id: Option<i32>, title: Option<&str>) -> Vec<Post> {
        let title = title.map(|t| t.to_lowercase());
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.parent_id.is_none() && p.group_id == group_id)
            .filter(|p| match &title {
                Some(t) => p.title.to_lowercase().contains(t.as_str()),
                None => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UniquenessOracle for MemoryPosts {
    async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.posts.lock().unwrap().iter().any(|p| p.unique_id == unique_id))
    }
}

#[async_trait]
impl PostRepository for MemoryPosts {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Post>, DatabaseError> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.unique_id == unique_id).cloned())
    }

    async fn persist(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.unique_id == post.unique_id) {
            return Err(DatabaseError::UniqueViolation("posts_unique_id_key".to_string()));
        }

        let post = Post {
            id: posts.len() as i32 + 1,
            unique_id: post.unique_id,
            title: post.title,
            user_id: post.user_id,
            path: post.path,
            parent_id: post.parent_id,
            group_id: post.group_id,
            method: post.method as i32,
            post_type: post.post_type as i32,
            created_at: Utc::now(),
            options: Vec::new(),
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn children_of(&self, parent: &Post) -> Result<Vec<Post>, DatabaseError> {
        let children = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.parent_id == Some(parent.id))
            .cloned()
            .collect();
        Ok(Self::newest_first(children, i64::MAX))
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        Ok(Self::newest_first(self.top_level(None, None), limit))
    }

    async fn latest_in_group(&self, group: &Group, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        Ok(Self::newest_first(self.top_level(Some(group.id), None), limit))
    }

    async fn find_by_title(&self, title: &str, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        Ok(Self::newest_first(self.top_level(None, Some(title)), limit))
    }

    async fn find_by_title_in_group(
        &self,
        title: &str,
        group: &Group,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        Ok(Self::newest_first(self.top_level(Some(group.id), Some(title)), limit))
    }

    async fn set_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        if let Some(stored) = posts.iter_mut().find(|p| p.id == post.id) {
            stored.options = with_post_uid(post, options);
        }
        Ok(())
    }

    async fn add_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        if let Some(stored) = posts.iter_mut().find(|p| p.id == post.id) {
            stored.options.extend(with_post_uid(post, options));
        }
        Ok(())
    }

    async fn remove_options(&self, post: &Post) -> Result<(), DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        if let Some(stored) = posts.iter_mut().find(|p| p.id == post.id) {
            stored.options.clear();
        }
        Ok(())
    }

    async fn remove(&self, post: &Post) -> Result<(), DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        let mut doomed = vec![post.id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(posts.iter().filter(|p| p.parent_id == Some(parent)).map(|p| p.id));
            i += 1;
        }
        posts.retain(|p| !doomed.contains(&p.id));
        Ok(())
    }
}

fn with_post_uid(post: &Post, options: &[PostOption]) -> Vec<PostOption> {
    options
        .iter()
        .map(|o| PostOption {
            post_uid: post.unique_id.clone(),
            ..o.clone()
        })
        .collect()
}

/// Keeps the names of stored files without touching the disk
#[derive(Default)]
pub struct SpyFileStore {
    pub writes: AtomicUsize,
    pub stored: Mutex<Vec<String>>,
}

#[async_trait]
impl FileStore for SpyFileStore {
    async fn store(&self, kind: PostType, content_type: &str, _bytes: &[u8]) -> Result<String, StorageError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(?kind, content_type, "spy store");
        let name = format!("upload-{}.bin", n);
        self.stored.lock().unwrap().push(name.clone());
        Ok(name)
    }

    async fn remove(&self, _kind: PostType, name: &str) -> Result<(), StorageError> {
        self.stored.lock().unwrap().retain(|stored| stored != name);
        Ok(())
    }
}

/// Application state over in-memory repositories, with handles kept for assertions
pub struct TestApp {
    pub config: AppConfig,
    pub users: Arc<MemoryUsers>,
    pub groups: Arc<MemoryGroups>,
    pub posts: Arc<MemoryPosts>,
    pub files: Arc<SpyFileStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_tests())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(MemoryUsers::default());
        Self {
            config,
            groups: Arc::new(MemoryGroups::new(users.clone())),
            users,
            posts: Arc::new(MemoryPosts::default()),
            files: Arc::new(SpyFileStore::default()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            users: self.users.clone(),
            groups: self.groups.clone(),
            posts: self.posts.clone(),
            files: self.files.clone(),
            uid_policy: RetryPolicy {
                max_attempts: 10,
                backoff: Duration::ZERO,
            },
            pool: None,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.email.clone(), self.config.security.jwt_expiry_hours);
        auth::issue(&claims, &self.config.security.jwt_secret).unwrap()
    }

    pub fn file_writes(&self) -> usize {
        self.files.writes.load(Ordering::SeqCst)
    }

    /// Files written and not removed again
    pub fn stored_files(&self) -> Vec<String> {
        self.files.stored.lock().unwrap().clone()
    }
}

/// Drive one request through `router` in-process
pub async fn send(router: axum::Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> axum::body::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}
