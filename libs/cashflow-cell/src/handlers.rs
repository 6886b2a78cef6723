use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CashFlowQuery, CreateCashFlowRequest, UpdateCashFlowRequest};
use crate::services::CashFlowService;

#[axum::debug_handler]
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashFlowQuery>,
) -> Result<Json<Value>, AppError> {
    let service = CashFlowService::new(&state);

    let entries = service.list_entries(&query).await?;

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashFlowQuery>,
) -> Result<Json<Value>, AppError> {
    let service = CashFlowService::new(&state);

    let summary = service.summary(&query).await?;

    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCashFlowRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Cash flow entry creation requested by {}", user.id);
    let service = CashFlowService::new(&state);

    let entry = service.create_entry(request).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdateCashFlowRequest>,
) -> Result<Json<Value>, AppError> {
    let service = CashFlowService::new(&state);

    let entry = service.update_entry(entry_id, request).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Cash flow entry delete requested by {}", user.id);
    let service = CashFlowService::new(&state);

    service.delete_entry(entry_id).await?;

    Ok(Json(json!({ "deleted": entry_id })))
}
