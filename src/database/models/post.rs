use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Media kind of a post, stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    Image = 0,
    Video = 1,
}

impl TryFrom<i32> for PostType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PostType::Image),
            1 => Ok(PostType::Video),
            other => Err(other),
        }
    }
}

/// Creativity method a post was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostMethod {
    OneOhOne = 0,
    LotusBlossom = 1,
    Scamper = 2,
    Other = 3,
}

impl TryFrom<i32> for PostMethod {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PostMethod::OneOhOne),
            1 => Ok(PostMethod::LotusBlossom),
            2 => Ok(PostMethod::Scamper),
            3 => Ok(PostMethod::Other),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    #[serde(skip_serializing)]
    pub id: i32,
    pub unique_id: String,
    pub title: String,
    pub user_id: i32,
    pub path: String,
    #[serde(skip_serializing)]
    pub parent_id: Option<i32>,
    #[serde(skip_serializing)]
    pub group_id: Option<i32>,
    pub method: i32,
    #[serde(rename = "type")]
    pub post_type: i32,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub options: Vec<PostOption>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub unique_id: String,
    pub title: String,
    pub user_id: i32,
    pub path: String,
    pub parent_id: Option<i32>,
    pub group_id: Option<i32>,
    pub method: PostMethod,
    pub post_type: PostType,
}

/// Key/value pair attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostOption {
    #[sqlx(rename = "opt_key")]
    pub key: String,
    #[sqlx(rename = "opt_value")]
    pub value: String,
    #[serde(default)]
    pub post_uid: String,
}
