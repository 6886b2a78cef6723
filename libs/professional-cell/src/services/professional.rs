use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::AppState;

use crate::models::{
    CreateProfessionalRequest, Professional, ProfessionalError, ReplaceScheduleRequest,
    UpdateProfessionalRequest, WorkSchedule,
};

pub struct ProfessionalService {
    pool: PgPool,
}

impl ProfessionalService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_professionals(&self) -> Result<Vec<Professional>, ProfessionalError> {
        let professionals = sqlx::query_as::<_, Professional>(
            "SELECT * FROM professionals ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(professionals)
    }

    /// The professional every booking lands on when staff configuration never
    /// created one. Returns the earliest record, creating it on first use.
    pub async fn ensure_default(&self) -> Result<Professional, ProfessionalError> {
        let existing = sqlx::query_as::<_, Professional>(
            "SELECT * FROM professionals ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(professional) = existing {
            return Ok(professional);
        }

        let created = sqlx::query_as::<_, Professional>(
            r#"
            INSERT INTO professionals (id, full_name, specialty)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind("Default Professional")
        .bind("Kinesiology")
        .fetch_one(&self.pool)
        .await?;

        info!("Default professional created: {}", created.id);
        Ok(created)
    }

    pub async fn create_professional(
        &self,
        request: CreateProfessionalRequest,
    ) -> Result<Professional, ProfessionalError> {
        if request.full_name.trim().is_empty() {
            return Err(ProfessionalError::ValidationError(
                "full_name is required".to_string(),
            ));
        }

        let created = sqlx::query_as::<_, Professional>(
            r#"
            INSERT INTO professionals (id, full_name, license_number, specialty)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.full_name.trim())
        .bind(&request.license_number)
        .bind(&request.specialty)
        .fetch_one(&self.pool)
        .await?;

        info!("Professional created: {}", created.id);
        Ok(created)
    }

    pub async fn update_professional(
        &self,
        professional_id: Uuid,
        request: UpdateProfessionalRequest,
    ) -> Result<Professional, ProfessionalError> {
        debug!("Updating professional: {}", professional_id);

        let updated = sqlx::query_as::<_, Professional>(
            r#"
            UPDATE professionals SET
                full_name = COALESCE($2, full_name),
                license_number = COALESCE($3, license_number),
                specialty = COALESCE($4, specialty),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(professional_id)
        .bind(&request.full_name)
        .bind(&request.license_number)
        .bind(&request.specialty)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ProfessionalError::NotFound)?;

        Ok(updated)
    }

    pub async fn delete_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<(), ProfessionalError> {
        let (appointment_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM appointments WHERE professional_id = $1")
                .bind(professional_id)
                .fetch_one(&self.pool)
                .await?;

        if appointment_count > 0 {
            return Err(ProfessionalError::HasAppointments);
        }

        let result = sqlx::query("DELETE FROM professionals WHERE id = $1")
            .bind(professional_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ProfessionalError::NotFound);
        }

        info!("Professional deleted: {}", professional_id);
        Ok(())
    }

    pub async fn get_schedule(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<WorkSchedule>, ProfessionalError> {
        let windows = sqlx::query_as::<_, WorkSchedule>(
            r#"
            SELECT * FROM work_schedules
            WHERE professional_id = $1
            ORDER BY day_of_week ASC, start_time ASC
            "#,
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(windows)
    }

    /// Swap the whole weekly grid in one transaction so the agenda never
    /// shows a half-replaced schedule.
    pub async fn replace_schedule(
        &self,
        professional_id: Uuid,
        request: ReplaceScheduleRequest,
    ) -> Result<Vec<WorkSchedule>, ProfessionalError> {
        crate::models::validate_windows(&request.windows)?;

        let exists = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM professionals WHERE id = $1")
            .bind(professional_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(ProfessionalError::NotFound);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM work_schedules WHERE professional_id = $1")
            .bind(professional_id)
            .execute(&mut *tx)
            .await?;

        for window in &request.windows {
            sqlx::query(
                r#"
                INSERT INTO work_schedules (id, professional_id, day_of_week, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(professional_id)
            .bind(window.day_of_week)
            .bind(window.start_time)
            .bind(window.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Replaced schedule for professional {} with {} windows",
            professional_id,
            request.windows.len()
        );
        self.get_schedule(professional_id).await
    }
}
