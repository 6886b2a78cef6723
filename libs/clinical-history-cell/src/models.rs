// libs/clinical-history-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::AppointmentStatus;
use patient_cell::models::UpdatePatientRequest;

/// Diagnosis recorded when an entry is appended with no diagnosis anywhere in
/// sight (no new value, nothing on the appointment).
pub const DIAGNOSIS_PLACEHOLDER: &str = "EVOLUCIÓN";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClinicalHistoryEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub diagnosis: String,
    pub evolution: String,
    pub recorded_at: DateTime<Utc>,
}

/// One clinical update against an appointment. Every field is optional; a
/// request carrying none of them is rejected before any write happens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvolutionUpdateRequest {
    pub diagnosis: Option<String>,
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "patientData", default)]
    pub patient_data: Option<UpdatePatientRequest>,
    #[serde(rename = "evolutionNote")]
    pub evolution_note: Option<String>,
}

impl EvolutionUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.diagnosis.as_deref().map_or(true, |d| d.trim().is_empty())
            && self.status.is_none()
            && self
                .patient_data
                .as_ref()
                .map_or(true, |patch| patch.is_vacuous())
            && self
                .evolution_note
                .as_deref()
                .map_or(true, |note| note.trim().is_empty())
    }
}

/// Direct entry creation, outside the evolution-sync flow.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHistoryEntryRequest {
    pub patient_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub evolution: String,
}

/// Direct in-place edit of an existing entry (the editable-entry flow; sync
/// never updates entries).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHistoryEntryRequest {
    pub diagnosis: Option<String>,
    pub evolution: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("No updatable fields were supplied")]
    EmptyUpdate,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("History entry not found")]
    EntryNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for EvolutionError {
    fn from(err: sqlx::Error) -> Self {
        EvolutionError::DatabaseError(err.to_string())
    }
}

impl From<professional_cell::models::ProfessionalError> for EvolutionError {
    fn from(err: professional_cell::models::ProfessionalError) -> Self {
        EvolutionError::DatabaseError(err.to_string())
    }
}

impl From<EvolutionError> for shared_models::error::AppError {
    fn from(err: EvolutionError) -> Self {
        use shared_models::error::AppError;
        match err {
            EvolutionError::EmptyUpdate => AppError::BadRequest(err.to_string()),
            EvolutionError::AppointmentNotFound
            | EvolutionError::PatientNotFound
            | EvolutionError::EntryNotFound => AppError::NotFound(err.to_string()),
            EvolutionError::ValidationError(msg) => AppError::ValidationError(msg),
            EvolutionError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requests_are_detected() {
        assert!(EvolutionUpdateRequest::default().is_empty());

        let blank = EvolutionUpdateRequest {
            diagnosis: Some("   ".to_string()),
            evolution_note: Some(String::new()),
            patient_data: Some(UpdatePatientRequest::default()),
            ..Default::default()
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn any_single_field_makes_the_request_actionable() {
        let with_status = EvolutionUpdateRequest {
            status: Some(AppointmentStatus::Completed),
            ..Default::default()
        };
        assert!(!with_status.is_empty());

        let with_flag: EvolutionUpdateRequest =
            serde_json::from_str(r#"{"patientData": {"hasMarcapasos": true}}"#).unwrap();
        assert!(!with_flag.is_empty());
    }
}
