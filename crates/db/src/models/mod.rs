//! Row types decoded by the repositories.

pub mod role;
pub mod session;
pub mod user;
