//! Domain core for the Warden authentication backend.
//!
//! Holds the session model and lifecycle policy, the collaborator traits
//! (session store, user directory, role store), role constants with the
//! explicit authorization check, and the token/hash primitives. Nothing in
//! this crate performs I/O.

pub mod error;
pub mod hashing;
pub mod roles;
pub mod session;
pub mod tokens;
pub mod types;
pub mod user;
