use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::{
    GroupRepository, PgGroupRepository, PgPostRepository, PgUserRepository, PostRepository,
    UserRepository,
};
use crate::services::{FileStore, IdentityResolver, LocalFileStore, MembershipResolver, RetryPolicy};

/// Everything a request needs, shared across tasks
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub files: Arc<dyn FileStore>,
    pub uid_policy: RetryPolicy,
    /// Only used by `/health`; absent when the repositories are not database backed
    pub pool: Option<PgPool>,
}

impl AppState {
    /// PostgreSQL repositories over `pool`, uploads below the working directory
    pub fn from_pool(config: AppConfig, pool: PgPool) -> Self {
        let files = LocalFileStore::new(".", &config.media);

        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            files: Arc::new(files),
            uid_policy: RetryPolicy::default(),
            pool: Some(pool),
        }
    }

    pub fn identity(&self) -> IdentityResolver {
        IdentityResolver::new(self.users.clone())
    }

    pub fn membership(&self) -> MembershipResolver {
        MembershipResolver::new(self.groups.clone())
    }
}
