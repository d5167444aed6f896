pub mod authz;
pub mod identity;
pub mod membership;
pub mod storage;
pub mod uid;

pub use identity::{IdentityError, IdentityResolver, Registration};
pub use membership::MembershipResolver;
pub use storage::{FileStore, LocalFileStore, StorageError};
pub use uid::{RetryPolicy, UidError};
