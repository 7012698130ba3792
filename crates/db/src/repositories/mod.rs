//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! any PostgreSQL executor (`&PgPool` or a transaction) as the first argument.

pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
