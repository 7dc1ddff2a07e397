use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;
use well_guide_cell::router::well_guide_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Well Guide API is running!" }))
        .nest("/well-guide", well_guide_routes(state))
}
