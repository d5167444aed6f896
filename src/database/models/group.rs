use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    #[serde(skip_serializing)]
    pub id: i32,
    pub unique_id: String,
    pub title: String,
    #[serde(skip_serializing)]
    pub admin_id: i32,
    pub public: bool,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub unique_id: String,
    pub title: String,
    pub admin_id: i32,
    pub public: bool,
}
