use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use cashflow_cell::router::cashflow_routes;
use clinical_history_cell::router::{evolution_routes, history_routes};
use patient_cell::router::patient_routes;
use professional_cell::router::professional_routes;
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Kinesia Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest(
            "/appointments",
            appointment_routes(state.clone()).merge(evolution_routes(state.clone())),
        )
        .nest("/history", history_routes(state.clone()))
        .nest("/professionals", professional_routes(state.clone()))
        .nest("/cashflow", cashflow_routes(state))
}
