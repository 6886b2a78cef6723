use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateHistoryEntryRequest, EvolutionUpdateRequest, UpdateHistoryEntryRequest,
};
use crate::services::{EvolutionService, HistoryService};

/// The evolution sync endpoint, mounted under the appointments routes.
#[axum::debug_handler]
pub async fn apply_evolution(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<EvolutionUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Evolution update on {} requested by {}", appointment_id, user.id);
    let service = EvolutionService::new(&state);

    let appointment = service.apply_evolution(appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_patient_history(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = HistoryService::new(&state);

    let entries = service.list_for_patient(patient_id).await?;

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateHistoryEntryRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("History entry creation requested by {}", user.id);
    let service = HistoryService::new(&state);

    let entry = service.create_entry(request).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdateHistoryEntryRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HistoryService::new(&state);

    let entry = service.update_entry(entry_id, request).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("History entry delete requested by {}", user.id);
    let service = HistoryService::new(&state);

    service.delete_entry(entry_id).await?;

    Ok(Json(json!({ "deleted": entry_id })))
}
