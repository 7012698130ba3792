use axum::routing::get;
use axum::Router;

use crate::handlers::gates;
use crate::state::AppState;

/// Routes mounted at `/gates`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/ping", get(gates::admin_ping))
        .route("/attendant/ping", get(gates::attendant_ping))
        .route("/patient/ping", get(gates::patient_ping))
}
