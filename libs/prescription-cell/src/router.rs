// libs/prescription-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn prescription_routes(state: Arc<AppConfig>) -> Router {
    // All prescription operations require authentication
    let protected_routes = Router::new()
        .route("/prescriptions", post(handlers::create_prescription))
        .route(
            "/patients/{patient_id}/prescriptions",
            get(handlers::get_patient_prescriptions),
        )
        .route(
            "/patients/{patient_id}/prescription-trends",
            get(handlers::get_prescription_trends),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
