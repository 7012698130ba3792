pub mod auth;
pub mod gates;
pub mod sessions;
