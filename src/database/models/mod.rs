pub mod group;
pub mod post;
pub mod user;

pub use group::{Group, NewGroup};
pub use post::{NewPost, Post, PostMethod, PostOption, PostType};
pub use user::{NewUser, User};
