use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{Group, NewGroup, NewPost, NewUser, Post, PostOption, User};

/// Answers "is this external identifier already taken"
#[async_trait]
pub trait UniquenessOracle: Send + Sync {
    async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Fails with `UniqueViolation` when the email is taken
    async fn persist(&self, user: NewUser) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait GroupRepository: UniquenessOracle {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Group>, DatabaseError>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Group>, DatabaseError>;

    /// Inserts the group and the admin's membership atomically
    async fn persist(&self, group: NewGroup) -> Result<Group, DatabaseError>;

    /// Idempotent: adding an existing member is a no-op
    async fn add_member(&self, user: &User, group: &Group) -> Result<(), DatabaseError>;

    async fn is_member(&self, user: &User, group: &Group) -> Result<bool, DatabaseError>;

    async fn members_of(&self, group: &Group) -> Result<Vec<User>, DatabaseError>;

    async fn groups_of(&self, user: &User) -> Result<Vec<Group>, DatabaseError>;

    async fn update_visibility(&self, group: &Group, public: bool) -> Result<(), DatabaseError>;

    /// Removes the group together with its memberships and posts
    async fn remove(&self, group: &Group) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait PostRepository: UniquenessOracle {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Post>, DatabaseError>;

    async fn persist(&self, post: NewPost) -> Result<Post, DatabaseError>;

    async fn children_of(&self, parent: &Post) -> Result<Vec<Post>, DatabaseError>;

    /// Newest top-level posts outside of any group
    async fn latest(&self, limit: i64) -> Result<Vec<Post>, DatabaseError>;

    /// Newest top-level posts of one group
    async fn latest_in_group(&self, group: &Group, limit: i64) -> Result<Vec<Post>, DatabaseError>;

    async fn find_by_title(&self, title: &str, limit: i64) -> Result<Vec<Post>, DatabaseError>;

    async fn find_by_title_in_group(
        &self,
        title: &str,
        group: &Group,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError>;

    /// Replaces every option of the post in one transaction
    async fn set_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError>;

    async fn add_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError>;

    async fn remove_options(&self, post: &Post) -> Result<(), DatabaseError>;

    /// Removes the post, its options and its descendants
    async fn remove(&self, post: &Post) -> Result<(), DatabaseError>;
}
