// Public endpoints: no token, only the API key stage
pub mod auth;
pub mod config;
pub mod health;

pub use auth::{login, register};
pub use config::get_config;
pub use health::health;
