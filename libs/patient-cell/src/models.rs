// libs/patient-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient identity record. The three alert flags keep the camelCase names
/// the browser client sends (`hasCancer`, `hasMarcapasos`, `usesEA`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub dni: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub health_insurance: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "hasCancer")]
    pub has_cancer: bool,
    #[serde(rename = "hasMarcapasos")]
    pub has_marcapasos: bool,
    #[serde(rename = "usesEA")]
    pub uses_ea: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert input: `dni` is the identity key, everything else refreshes the
/// record when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPatientRequest {
    pub dni: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub health_insurance: Option<String>,
    /// Date-only string or ISO timestamp; normalized by the shared rule.
    pub birth_date: Option<String>,
}

impl UpsertPatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.dni.trim().is_empty() {
            return Err(PatientError::ValidationError("dni is required".to_string()));
        }
        if self.full_name.trim().is_empty() {
            return Err(PatientError::ValidationError(
                "full_name is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Field-wise update. Absent fields leave the stored value untouched; the
/// alert booleans distinguish an explicit `false` from "not supplied".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub health_insurance: Option<String>,
    pub birth_date: Option<String>,
    #[serde(rename = "hasCancer", default)]
    pub has_cancer: Option<bool>,
    #[serde(rename = "hasMarcapasos", default)]
    pub has_marcapasos: Option<bool>,
    #[serde(rename = "usesEA", default)]
    pub uses_ea: Option<bool>,
}

impl UpdatePatientRequest {
    /// True when the patch carries no field at all.
    pub fn is_vacuous(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.health_insurance.is_none()
            && self.birth_date.is_none()
            && self.has_cancer.is_none()
            && self.has_marcapasos.is_none()
            && self.uses_ea.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    pub dni: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient still owns appointments")]
    HasAppointments,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PatientError {
    fn from(err: sqlx::Error) -> Self {
        PatientError::DatabaseError(err.to_string())
    }
}

impl From<PatientError> for shared_models::error::AppError {
    fn from(err: PatientError) -> Self {
        use shared_models::error::AppError;
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::HasAppointments => AppError::Conflict(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_requires_dni_and_name() {
        let request = UpsertPatientRequest {
            dni: "  ".to_string(),
            full_name: "Ana Suárez".to_string(),
            phone: None,
            health_insurance: None,
            birth_date: None,
        };
        assert!(request.validate().is_err());

        let request = UpsertPatientRequest {
            dni: "30111222".to_string(),
            full_name: String::new(),
            phone: None,
            health_insurance: None,
            birth_date: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn alert_flags_distinguish_absent_from_false() {
        let patch: UpdatePatientRequest =
            serde_json::from_str(r#"{"hasCancer": false}"#).unwrap();

        assert_eq!(patch.has_cancer, Some(false));
        assert_eq!(patch.has_marcapasos, None);
        assert_eq!(patch.uses_ea, None);
    }
}
