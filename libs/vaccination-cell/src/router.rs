// libs/vaccination-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn vaccination_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/vaccines/save-check", post(handlers::save_vaccine_check))
        .route(
            "/vaccines/check-history",
            get(handlers::get_vaccine_check_history),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
