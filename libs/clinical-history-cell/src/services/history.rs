use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use professional_cell::services::ProfessionalService;
use shared_database::AppState;

use crate::models::{
    ClinicalHistoryEntry, CreateHistoryEntryRequest, EvolutionError, UpdateHistoryEntryRequest,
    DIAGNOSIS_PLACEHOLDER,
};

pub struct HistoryService {
    pool: PgPool,
}

impl HistoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ClinicalHistoryEntry>, EvolutionError> {
        debug!("Listing clinical history for patient {}", patient_id);

        let entries = sqlx::query_as::<_, ClinicalHistoryEntry>(
            r#"
            SELECT * FROM clinical_histories
            WHERE patient_id = $1
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Direct entry creation, used by the history screen rather than the
    /// evolution sync.
    pub async fn create_entry(
        &self,
        request: CreateHistoryEntryRequest,
    ) -> Result<ClinicalHistoryEntry, EvolutionError> {
        if request.evolution.trim().is_empty() {
            return Err(EvolutionError::ValidationError(
                "evolution text is required".to_string(),
            ));
        }

        let professional_id = match request.professional_id {
            Some(id) => id,
            None => {
                let professional_service = ProfessionalService::with_pool(self.pool.clone());
                professional_service.ensure_default().await?.id
            }
        };

        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| DIAGNOSIS_PLACEHOLDER.to_string());

        let entry = sqlx::query_as::<_, ClinicalHistoryEntry>(
            r#"
            INSERT INTO clinical_histories
                (id, patient_id, professional_id, diagnosis, evolution, recorded_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.patient_id)
        .bind(professional_id)
        .bind(&diagnosis)
        .bind(request.evolution.trim())
        .fetch_one(&self.pool)
        .await?;

        info!("History entry {} created for patient {}", entry.id, entry.patient_id);
        Ok(entry)
    }

    /// The editable-entry flow: history stays append-only under sync, but a
    /// clinician may correct an entry's text directly.
    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        request: UpdateHistoryEntryRequest,
    ) -> Result<ClinicalHistoryEntry, EvolutionError> {
        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_uppercase);

        let entry = sqlx::query_as::<_, ClinicalHistoryEntry>(
            r#"
            UPDATE clinical_histories SET
                diagnosis = COALESCE($2, diagnosis),
                evolution = COALESCE($3, evolution)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(entry_id)
        .bind(&diagnosis)
        .bind(&request.evolution)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EvolutionError::EntryNotFound)?;

        Ok(entry)
    }

    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<(), EvolutionError> {
        let result = sqlx::query("DELETE FROM clinical_histories WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EvolutionError::EntryNotFound);
        }

        info!("History entry {} deleted", entry_id);
        Ok(())
    }
}
