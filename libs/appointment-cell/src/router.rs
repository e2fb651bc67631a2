// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        // Lifecycle
        .route("/patients/appointments", post(handlers::book_appointment))
        .route(
            "/patients/appointments/{appointment_id}",
            put(handlers::update_appointment),
        )
        .route(
            "/patients/appointments/{appointment_id}",
            delete(handlers::delete_appointment),
        )
        .route(
            "/appointments/{appointment_id}/status",
            put(handlers::update_appointment_status),
        )
        .route(
            "/patients/{patient_id}/mark-past-as-no-show",
            post(handlers::mark_past_appointments_as_no_show),
        )
        // Calendars and histories
        .route(
            "/patients/calendar/{patient_id}",
            get(handlers::get_patient_calendar),
        )
        .route(
            "/doctors/calendar/{doctor_id}",
            get(handlers::get_doctor_calendar),
        )
        .route(
            "/patients/past-appointments/{patient_id}",
            get(handlers::get_patient_past_appointments),
        )
        .route(
            "/doctors/{doctor_id}/completed-appointments",
            get(handlers::get_doctor_completed_appointments),
        )
        .route(
            "/doctors/{doctor_id}/audit-logs",
            get(handlers::get_doctor_audit_logs),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
