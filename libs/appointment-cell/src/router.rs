use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(search_appointments))
        .route("/series", post(create_series))
        .route("/{id}", get(get_appointment))
        .route("/{id}", delete(delete_appointment))
        .route("/patient/{patient_id}/upcoming", delete(cancel_upcoming))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
