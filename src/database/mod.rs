pub mod groups;
pub mod manager;
pub mod models;
pub mod posts;
pub mod repository;
pub mod users;

pub use groups::PgGroupRepository;
pub use manager::{DatabaseError, DatabaseManager};
pub use posts::PgPostRepository;
pub use repository::{GroupRepository, PostRepository, UniquenessOracle, UserRepository};
pub use users::PgUserRepository;
