use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn well_guide_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_well_guides))
        .route(
            "/{patient_id}",
            get(handlers::get_patient_well_guides).put(handlers::update_well_guide_detail),
        )
        .route("/{patient_id}/remindMe", put(handlers::enable_reminder))
        .route("/{patient_id}/refresh", post(handlers::refresh_well_guides))
        .with_state(state)
}
