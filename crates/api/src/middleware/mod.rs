//! Request extractors for authentication, authorization and client metadata.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMINISTRATOR` role.
//! - [`rbac::RequireAttendant`] -- Requires the `ATTENDANT` role.
//! - [`rbac::RequirePatient`] -- Requires the `PATIENT` role.
//! - [`client::ClientInfo`] -- Caller IP and user agent for session records.

pub mod auth;
pub mod client;
pub mod rbac;
