use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn cashflow_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_entries))
        .route("/", post(create_entry))
        .route("/summary", get(get_summary))
        .route("/{id}", put(update_entry))
        .route("/{id}", delete(delete_entry))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
