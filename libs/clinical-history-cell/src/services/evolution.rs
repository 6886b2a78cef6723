// libs/clinical-history-cell/src/services/evolution.rs
//
// One clinical update fans out to three tables: the appointment (diagnosis /
// status), the owning patient (demographics and alert flags) and an appended
// history entry. All of it commits as a single transaction; the alert flags a
// clinician sees can never drift from what the history says was recorded.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentWithPatient, DbAppointment};
use patient_cell::models::{Patient, UpdatePatientRequest};
use shared_database::AppState;
use shared_utils::dates::parse_clinic_day;

use crate::models::{EvolutionError, EvolutionUpdateRequest, DIAGNOSIS_PLACEHOLDER};

pub struct EvolutionService {
    pool: PgPool,
}

impl EvolutionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply a clinical update to an appointment and everything it touches.
    pub async fn apply_evolution(
        &self,
        appointment_id: Uuid,
        request: EvolutionUpdateRequest,
    ) -> Result<AppointmentWithPatient, EvolutionError> {
        if request.is_empty() {
            return Err(EvolutionError::EmptyUpdate);
        }

        debug!("Applying evolution to appointment {}", appointment_id);
        let new_diagnosis = normalize_diagnosis(request.diagnosis.as_deref());

        let mut tx = self.pool.begin().await?;

        let appointment = sqlx::query_as::<_, DbAppointment>(
            "SELECT * FROM appointments WHERE id = $1 FOR UPDATE",
        )
        .bind(appointment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(EvolutionError::AppointmentNotFound)?;

        if new_diagnosis.is_some() || request.status.is_some() {
            sqlx::query(
                r#"
                UPDATE appointments SET
                    diagnosis = COALESCE($2, diagnosis),
                    status = COALESCE($3, status),
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(appointment_id)
            .bind(&new_diagnosis)
            .bind(request.status.map(|s| s.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        let patch = request.patient_data.filter(|p| !p.is_vacuous());
        let mut sync_note = None;

        if let Some(patch) = &patch {
            let current = sqlx::query_as::<_, Patient>(
                "SELECT * FROM patients WHERE id = $1 FOR UPDATE",
            )
            .bind(appointment.patient_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EvolutionError::PatientNotFound)?;

            let resolved = resolve_patient_patch(&current, patch)?;
            sqlx::query(
                r#"
                UPDATE patients SET
                    full_name = $2,
                    phone = $3,
                    health_insurance = $4,
                    birth_date = $5,
                    has_cancer = $6,
                    has_marcapasos = $7,
                    uses_ea = $8,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(current.id)
            .bind(&resolved.full_name)
            .bind(&resolved.phone)
            .bind(&resolved.health_insurance)
            .bind(resolved.birth_date)
            .bind(resolved.has_cancer)
            .bind(resolved.has_marcapasos)
            .bind(resolved.uses_ea)
            .execute(&mut *tx)
            .await?;

            sync_note = Some(build_sync_note(&resolved));
        }

        let evolution_text =
            compose_evolution_text(request.evolution_note.as_deref(), sync_note.as_deref());

        if !evolution_text.is_empty() || new_diagnosis.is_some() {
            let entry_diagnosis =
                resolve_diagnosis(new_diagnosis.as_deref(), appointment.diagnosis.as_deref());

            sqlx::query(
                r#"
                INSERT INTO clinical_histories
                    (id, patient_id, professional_id, diagnosis, evolution, recorded_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(appointment.patient_id)
            .bind(appointment.professional_id)
            .bind(&entry_diagnosis)
            .bind(&evolution_text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Evolution applied to appointment {}", appointment_id);

        self.load_with_patient(appointment_id).await
    }

    async fn load_with_patient(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentWithPatient, EvolutionError> {
        let row = sqlx::query_as::<_, DbAppointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EvolutionError::AppointmentNotFound)?;

        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(row.patient_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EvolutionError::PatientNotFound)?;

        Ok(AppointmentWithPatient {
            appointment: Appointment::from(row),
            patient,
        })
    }
}

/// Patient row image after applying a patch: absent fields keep the stored
/// value, present fields win, and an explicit `false` on an alert flag is a
/// real clear, not a no-op.
#[derive(Debug, Clone)]
pub struct ResolvedPatientUpdate {
    pub full_name: String,
    pub phone: Option<String>,
    pub health_insurance: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub has_cancer: bool,
    pub has_marcapasos: bool,
    pub uses_ea: bool,
}

pub fn resolve_patient_patch(
    current: &Patient,
    patch: &UpdatePatientRequest,
) -> Result<ResolvedPatientUpdate, EvolutionError> {
    let birth_date = match patch.birth_date.as_deref() {
        None => current.birth_date,
        Some(raw) => Some(
            parse_clinic_day(raw).map_err(|e| EvolutionError::ValidationError(e.to_string()))?,
        ),
    };

    Ok(ResolvedPatientUpdate {
        full_name: patch
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| current.full_name.clone()),
        phone: patch.phone.clone().or_else(|| current.phone.clone()),
        health_insurance: patch
            .health_insurance
            .clone()
            .or_else(|| current.health_insurance.clone()),
        birth_date,
        has_cancer: patch.has_cancer.unwrap_or(current.has_cancer),
        has_marcapasos: patch.has_marcapasos.unwrap_or(current.has_marcapasos),
        uses_ea: patch.uses_ea.unwrap_or(current.uses_ea),
    })
}

/// Alert states as the clinicians read them in the history timeline.
pub fn build_sync_note(resolved: &ResolvedPatientUpdate) -> String {
    format!(
        "Datos del paciente sincronizados. Oncológico: {}. Marcapasos: {}. EA: {}.",
        si_no(resolved.has_cancer),
        si_no(resolved.has_marcapasos),
        si_no(resolved.uses_ea)
    )
}

fn si_no(flag: bool) -> &'static str {
    if flag {
        "SI"
    } else {
        "NO"
    }
}

/// Diagnoses are recorded upper-cased; blank input counts as not supplied.
pub fn normalize_diagnosis(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_uppercase)
}

pub fn compose_evolution_text(note: Option<&str>, sync_note: Option<&str>) -> String {
    [note, sync_note]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// New value wins, then whatever the appointment already carried, then the
/// literal placeholder.
pub fn resolve_diagnosis(new_diagnosis: Option<&str>, prior: Option<&str>) -> String {
    new_diagnosis
        .map(str::to_string)
        .or_else(|| {
            prior
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DIAGNOSIS_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            dni: "30111222".to_string(),
            full_name: "Ana Suárez".to_string(),
            phone: Some("011-5555-0000".to_string()),
            health_insurance: Some("OSDE".to_string()),
            birth_date: None,
            has_cancer: false,
            has_marcapasos: false,
            uses_ea: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn single_flag_patch_leaves_the_others_alone() {
        let patch = UpdatePatientRequest {
            has_marcapasos: Some(true),
            ..Default::default()
        };

        let resolved = resolve_patient_patch(&patient(), &patch).unwrap();
        assert!(resolved.has_marcapasos);
        assert!(!resolved.has_cancer);
        assert!(!resolved.uses_ea);
        assert_eq!(resolved.full_name, "Ana Suárez");
        assert_eq!(resolved.phone.as_deref(), Some("011-5555-0000"));
    }

    #[test]
    fn explicit_false_clears_a_set_flag() {
        let mut current = patient();
        current.has_cancer = true;

        let patch = UpdatePatientRequest {
            has_cancer: Some(false),
            ..Default::default()
        };

        let resolved = resolve_patient_patch(&current, &patch).unwrap();
        assert!(!resolved.has_cancer);
    }

    #[test]
    fn bad_birth_date_is_a_validation_error() {
        let patch = UpdatePatientRequest {
            birth_date: Some("31/12/1980".to_string()),
            ..Default::default()
        };

        assert_matches!(
            resolve_patient_patch(&patient(), &patch),
            Err(EvolutionError::ValidationError(_))
        );
    }

    #[test]
    fn sync_note_spells_out_the_alert_states() {
        let resolved = ResolvedPatientUpdate {
            full_name: "Ana Suárez".to_string(),
            phone: None,
            health_insurance: None,
            birth_date: None,
            has_cancer: false,
            has_marcapasos: true,
            uses_ea: false,
        };

        let note = build_sync_note(&resolved);
        assert!(note.contains("Marcapasos: SI"));
        assert!(note.contains("Oncológico: NO"));
        assert!(note.contains("EA: NO"));
    }

    #[test]
    fn diagnoses_are_upper_cased() {
        assert_eq!(
            normalize_diagnosis(Some("contractura")).as_deref(),
            Some("CONTRACTURA")
        );
        assert_eq!(
            normalize_diagnosis(Some("lumbalgia aguda")).as_deref(),
            Some("LUMBALGIA AGUDA")
        );
        assert_eq!(normalize_diagnosis(Some("   ")), None);
        assert_eq!(normalize_diagnosis(None), None);
    }

    #[test]
    fn entry_diagnosis_falls_back_to_prior_then_placeholder() {
        assert_eq!(
            resolve_diagnosis(Some("CONTRACTURA"), Some("LUMBALGIA")),
            "CONTRACTURA"
        );
        assert_eq!(resolve_diagnosis(None, Some("LUMBALGIA")), "LUMBALGIA");
        assert_eq!(resolve_diagnosis(None, Some("  ")), DIAGNOSIS_PLACEHOLDER);
        assert_eq!(resolve_diagnosis(None, None), DIAGNOSIS_PLACEHOLDER);
    }

    #[test]
    fn marcapasos_update_without_note_still_yields_a_full_entry() {
        // A diagnosis plus one alert flag and no free-text note: the entry
        // must carry the upper-cased diagnosis and the synthesized summary.
        let new_diagnosis = normalize_diagnosis(Some("contractura"));
        let patch = UpdatePatientRequest {
            has_marcapasos: Some(true),
            ..Default::default()
        };
        let resolved = resolve_patient_patch(&patient(), &patch).unwrap();

        let text = compose_evolution_text(None, Some(&build_sync_note(&resolved)));
        assert!(text.contains("Marcapasos: SI"));

        let entry_diagnosis = resolve_diagnosis(new_diagnosis.as_deref(), None);
        assert_eq!(entry_diagnosis, "CONTRACTURA");
    }

    #[test]
    fn repeated_identical_patches_converge() {
        let patch = UpdatePatientRequest {
            has_cancer: Some(true),
            phone: Some("011-5555-9999".to_string()),
            ..Default::default()
        };

        let first = resolve_patient_patch(&patient(), &patch).unwrap();

        let mut after_first = patient();
        after_first.full_name = first.full_name.clone();
        after_first.phone = first.phone.clone();
        after_first.health_insurance = first.health_insurance.clone();
        after_first.birth_date = first.birth_date;
        after_first.has_cancer = first.has_cancer;
        after_first.has_marcapasos = first.has_marcapasos;
        after_first.uses_ea = first.uses_ea;

        let second = resolve_patient_patch(&after_first, &patch).unwrap();
        assert_eq!(second.has_cancer, first.has_cancer);
        assert_eq!(second.has_marcapasos, first.has_marcapasos);
        assert_eq!(second.uses_ea, first.uses_ea);
        assert_eq!(second.phone, first.phone);
    }

    #[test]
    fn evolution_text_joins_note_and_sync_summary() {
        assert_eq!(
            compose_evolution_text(Some("Buena respuesta al tratamiento"), None),
            "Buena respuesta al tratamiento"
        );

        let both = compose_evolution_text(
            Some("Buena respuesta al tratamiento"),
            Some("Datos del paciente sincronizados. Marcapasos: SI."),
        );
        assert_eq!(
            both,
            "Buena respuesta al tratamiento\nDatos del paciente sincronizados. Marcapasos: SI."
        );

        assert_eq!(compose_evolution_text(None, None), "");
        assert_eq!(compose_evolution_text(Some("  "), None), "");
    }
}
