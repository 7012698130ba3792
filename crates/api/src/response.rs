//! Shared response envelope types for API handlers.
//!
//! Collection and profile endpoints answer with a `{ "data": ... }`
//! envelope. Token endpoints return their payload unwrapped.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: roles }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
