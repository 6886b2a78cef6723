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

use crate::models::{AppointmentSearchQuery, CreateSeriesRequest};
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn create_series(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSeriesRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Series booking requested by {}", user.id);
    let service = BookingService::new(&state);

    let appointments = service.create_series(request).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "created": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointments = service.search_appointments(query).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Appointment delete requested by {}", user.id);
    let service = BookingService::new(&state);

    service.delete_appointment(appointment_id).await?;

    Ok(Json(json!({ "deleted": appointment_id })))
}

#[axum::debug_handler]
pub async fn cancel_upcoming(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Cancellation sweep requested by {}", user.id);
    let service = BookingService::new(&state);

    let cancelled = service.cancel_upcoming(patient_id).await?;

    Ok(Json(json!({ "cancelled": cancelled })))
}
