use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::database::manager::DatabaseError;
use crate::database::models::{Group, NewPost, Post, PostOption};
use crate::database::repository::{PostRepository, UniquenessOracle};

const POST_COLUMNS: &str =
    "id, unique_id, title, user_id, path, parent_id, group_id, method, post_type, created_at";

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the options of every post in one query and attach them
    async fn with_options(&self, mut posts: Vec<Post>) -> Result<Vec<Post>, DatabaseError> {
        if posts.is_empty() {
            return Ok(posts);
        }

        let uids: Vec<String> = posts.iter().map(|p| p.unique_id.clone()).collect();
        let options = sqlx::query_as::<_, PostOption>(
            "SELECT opt_key, opt_value, post_uid FROM options WHERE post_uid = ANY($1) ORDER BY id",
        )
        .bind(&uids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<String, Vec<PostOption>> = HashMap::new();
        for option in options {
            by_post.entry(option.post_uid.clone()).or_default().push(option);
        }
        for post in posts.iter_mut() {
            post.options = by_post.remove(&post.unique_id).unwrap_or_default();
        }

        Ok(posts)
    }

    async fn insert_options<'e, E>(executor: E, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if options.is_empty() {
            return Ok(());
        }

        let keys: Vec<String> = options.iter().map(|o| o.key.clone()).collect();
        let values: Vec<String> = options.iter().map(|o| o.value.clone()).collect();

        sqlx::query(
            "INSERT INTO options (post_uid, opt_key, opt_value)
             SELECT $1, k, v FROM UNNEST($2::text[], $3::text[]) AS t (k, v)",
        )
        .bind(&post.unique_id)
        .bind(&keys)
        .bind(&values)
        .execute(executor)
        .await?;

        Ok(())
    }
}

/// Escape LIKE wildcards so a title is matched literally
fn like_pattern(title: &str) -> String {
    let escaped = title
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UniquenessOracle for PgPostRepository {
    async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM posts WHERE unique_id = $1)")
                .bind(unique_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Post>, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE unique_id = $1",
            POST_COLUMNS
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await?;

        match post {
            Some(post) => Ok(self.with_options(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn persist(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (unique_id, title, user_id, path, parent_id, group_id, method, post_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            POST_COLUMNS
        ))
        .bind(&post.unique_id)
        .bind(&post.title)
        .bind(post.user_id)
        .bind(&post.path)
        .bind(post.parent_id)
        .bind(post.group_id)
        .bind(post.method as i32)
        .bind(post.post_type as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn children_of(&self, parent: &Post) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE parent_id = $1 ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .bind(parent.id)
        .fetch_all(&self.pool)
        .await?;

        self.with_options(posts).await
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts
             WHERE parent_id IS NULL AND group_id IS NULL
             ORDER BY created_at DESC LIMIT $1",
            POST_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_options(posts).await
    }

    async fn latest_in_group(&self, group: &Group, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts
             WHERE parent_id IS NULL AND group_id = $1
             ORDER BY created_at DESC LIMIT $2",
            POST_COLUMNS
        ))
        .bind(group.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_options(posts).await
    }

    async fn find_by_title(&self, title: &str, limit: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts
             WHERE parent_id IS NULL AND group_id IS NULL AND title ILIKE $1
             ORDER BY created_at DESC LIMIT $2",
            POST_COLUMNS
        ))
        .bind(like_pattern(title))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_options(posts).await
    }

    async fn find_by_title_in_group(
        &self,
        title: &str,
        group: &Group,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts
             WHERE parent_id IS NULL AND group_id = $1 AND title ILIKE $2
             ORDER BY created_at DESC LIMIT $3",
            POST_COLUMNS
        ))
        .bind(group.id)
        .bind(like_pattern(title))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_options(posts).await
    }

    async fn set_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM options WHERE post_uid = $1")
            .bind(&post.unique_id)
            .execute(&mut *tx)
            .await?;
        Self::insert_options(&mut *tx, post, options).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_options(&self, post: &Post, options: &[PostOption]) -> Result<(), DatabaseError> {
        Self::insert_options(&self.pool, post, options).await
    }

    async fn remove_options(&self, post: &Post) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM options WHERE post_uid = $1")
            .bind(&post.unique_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove(&self, post: &Post) -> Result<(), DatabaseError> {
        // Options and child posts cascade
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
