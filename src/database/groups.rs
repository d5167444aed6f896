use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Group, NewGroup, User};
use crate::database::repository::{GroupRepository, UniquenessOracle};

const GROUP_COLUMNS: &str = "id, unique_id, title, admin_id, public";

pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UniquenessOracle for PgGroupRepository {
    async fn unique_id_exists(&self, unique_id: &str) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM groups WHERE unique_id = $1)")
                .bind(unique_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<Group>, DatabaseError> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {} FROM groups WHERE unique_id = $1",
            GROUP_COLUMNS
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Group>, DatabaseError> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {} FROM groups WHERE id = $1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn persist(&self, group: NewGroup) -> Result<Group, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(&format!(
            "INSERT INTO groups (unique_id, title, admin_id, public) VALUES ($1, $2, $3, $4) RETURNING {}",
            GROUP_COLUMNS
        ))
        .bind(&group.unique_id)
        .bind(&group.title)
        .bind(group.admin_id)
        .bind(group.public)
        .fetch_one(&mut *tx)
        .await?;

        // The admin is always a member
        sqlx::query("INSERT INTO group_user (group_id, user_id) VALUES ($1, $2)")
            .bind(group.id)
            .bind(group.admin_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    async fn add_member(&self, user: &User, group: &Group) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO group_user (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group.id)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_member(&self, user: &User, group: &Group) -> Result<bool, DatabaseError> {
        let (member,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM group_user WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group.id)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    async fn members_of(&self, group: &Group) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.imei, u.password
             FROM users u
             INNER JOIN group_user gu ON gu.user_id = u.id
             WHERE gu.group_id = $1
             ORDER BY u.id",
        )
        .bind(group.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn groups_of(&self, user: &User) -> Result<Vec<Group>, DatabaseError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT g.id, g.unique_id, g.title, g.admin_id, g.public
             FROM groups g
             INNER JOIN group_user gu ON gu.group_id = g.id
             WHERE gu.user_id = $1
             ORDER BY g.id",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn update_visibility(&self, group: &Group, public: bool) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE groups SET public = $1 WHERE id = $2")
            .bind(public)
            .bind(group.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove(&self, group: &Group) -> Result<(), DatabaseError> {
        // Memberships and posts go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
