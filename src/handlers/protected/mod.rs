// Protected endpoints: token required, group_uid resolved when present
pub mod group;
pub mod post;
pub mod user;
