use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn professional_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_professionals))
        .route("/", post(create_professional))
        .route("/{id}", put(update_professional))
        .route("/{id}", delete(delete_professional))
        .route("/{id}/schedule", get(get_schedule))
        .route("/{id}/schedule", put(replace_schedule))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
