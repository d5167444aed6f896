use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub imei: String,
    /// argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password: String,
}

/// User row about to be inserted; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub imei: String,
    pub password: String,
}
