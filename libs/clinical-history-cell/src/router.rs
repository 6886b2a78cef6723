use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn history_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/patient/{patient_id}", get(list_patient_history))
        .route("/", post(create_entry))
        .route("/{id}", put(update_entry))
        .route("/{id}", delete(delete_entry))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Merged into the appointments subtree by the API router, so the sync flow
/// lives at PATCH /appointments/{id}/evolution.
pub fn evolution_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{id}/evolution", patch(apply_evolution))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
