//! Authentication and session lifecycle.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access-token issuance and offline verification.
//! - [`session`] -- the session service: login registration, cap eviction,
//!   refresh, revocation.
//! - [`service`] -- login / register / refresh / logout orchestration.
//! - [`seed`] -- development roles and users.

pub mod jwt;
pub mod password;
pub mod seed;
pub mod service;
pub mod session;
