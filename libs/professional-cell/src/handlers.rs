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
    CreateProfessionalRequest, ReplaceScheduleRequest, UpdateProfessionalRequest,
};
use crate::services::ProfessionalService;

#[axum::debug_handler]
pub async fn list_professionals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = ProfessionalService::new(&state);

    let professionals = service.list_professionals().await?;

    Ok(Json(json!({ "professionals": professionals })))
}

#[axum::debug_handler]
pub async fn create_professional(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProfessionalRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Professional create requested by {}", user.id);
    let service = ProfessionalService::new(&state);

    let professional = service.create_professional(request).await?;

    Ok(Json(json!(professional)))
}

#[axum::debug_handler]
pub async fn update_professional(
    State(state): State<Arc<AppState>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<UpdateProfessionalRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ProfessionalService::new(&state);

    let professional = service
        .update_professional(professional_id, request)
        .await?;

    Ok(Json(json!(professional)))
}

#[axum::debug_handler]
pub async fn delete_professional(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Professional delete requested by {}", user.id);
    let service = ProfessionalService::new(&state);

    service.delete_professional(professional_id).await?;

    Ok(Json(json!({ "deleted": professional_id })))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ProfessionalService::new(&state);

    let windows = service.get_schedule(professional_id).await?;

    Ok(Json(json!({ "windows": windows })))
}

#[axum::debug_handler]
pub async fn replace_schedule(
    State(state): State<Arc<AppState>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<ReplaceScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ProfessionalService::new(&state);

    let windows = service.replace_schedule(professional_id, request).await?;

    Ok(Json(json!({ "windows": windows })))
}
