use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use prescription_cell::router::prescription_routes;
use shared_config::AppConfig;
use vaccination_cell::router::vaccination_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointments API is running!" }))
        .nest(
            "/api",
            Router::new()
                .merge(appointment_routes(state.clone()))
                .merge(prescription_routes(state.clone()))
                .merge(vaccination_routes(state.clone())),
        )
}
