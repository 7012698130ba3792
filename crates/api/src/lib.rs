//! Warden API server library.
//!
//! Exposes config, state, error handling, the auth services and routes so
//! integration tests and the binary entrypoint share one wiring.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
