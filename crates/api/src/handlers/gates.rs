//! Role probe endpoints. Each answers only for callers holding the role.

use crate::middleware::rbac::{RequireAdmin, RequireAttendant, RequirePatient};

/// GET /api/v1/gates/admin/ping
pub async fn admin_ping(RequireAdmin(user): RequireAdmin) -> &'static str {
    tracing::debug!(user_id = user.user_id, "Admin gate passed");
    "pong admin"
}

/// GET /api/v1/gates/attendant/ping
pub async fn attendant_ping(RequireAttendant(user): RequireAttendant) -> &'static str {
    tracing::debug!(user_id = user.user_id, "Attendant gate passed");
    "pong attendant"
}

/// GET /api/v1/gates/patient/ping
pub async fn patient_ping(RequirePatient(user): RequirePatient) -> &'static str {
    tracing::debug!(user_id = user.user_id, "Patient gate passed");
    "pong patient"
}
