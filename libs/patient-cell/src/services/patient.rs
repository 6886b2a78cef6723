use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{is_unique_violation, AppState};
use shared_utils::dates::parse_clinic_day;

use crate::models::{
    Patient, PatientError, PatientSearchQuery, UpdatePatientRequest, UpsertPatientRequest,
};

pub struct PatientService {
    pool: PgPool,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find-by-dni, then create or refresh. A concurrent identical-dni insert
    /// can still slip between the read and the write; the unique constraint
    /// catches it and the loser re-fetches the winner's row.
    pub async fn upsert_by_dni(
        &self,
        request: &UpsertPatientRequest,
    ) -> Result<Patient, PatientError> {
        request.validate()?;
        let birth_date = parse_optional_day(request.birth_date.as_deref())?;

        if let Some(existing) = self.find_by_dni(&request.dni).await? {
            debug!("Refreshing existing patient {} (dni {})", existing.id, existing.dni);
            return self.refresh(&existing.id, request, birth_date).await;
        }

        let insert = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (id, dni, full_name, phone, health_insurance, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.dni.trim())
        .bind(request.full_name.trim())
        .bind(&request.phone)
        .bind(&request.health_insurance)
        .bind(birth_date)
        .fetch_one(&self.pool)
        .await;

        match insert {
            Ok(patient) => {
                info!("Patient created: {} (dni {})", patient.id, patient.dni);
                Ok(patient)
            }
            Err(err) if is_unique_violation(&err) => {
                debug!("Lost dni race for {}, re-fetching", request.dni);
                self.find_by_dni(&request.dni)
                    .await?
                    .ok_or(PatientError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_dni(&self, dni: &str) -> Result<Option<Patient>, PatientError> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE dni = $1")
            .bind(dni.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut builder = QueryBuilder::new("SELECT * FROM patients WHERE 1=1");
        if let Some(name) = &query.name {
            builder.push(" AND full_name ILIKE ");
            builder.push_bind(format!("%{}%", name));
        }
        if let Some(dni) = &query.dni {
            builder.push(" AND dni = ");
            builder.push_bind(dni.trim().to_string());
        }
        builder.push(" ORDER BY full_name ASC LIMIT ");
        builder.push_bind(query.limit.unwrap_or(50));
        builder.push(" OFFSET ");
        builder.push_bind(query.offset.unwrap_or(0));

        let patients = builder
            .build_query_as::<Patient>()
            .fetch_all(&self.pool)
            .await?;

        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);
        let birth_date = parse_optional_day(request.birth_date.as_deref())?;

        let updated = sqlx::query_as::<_, Patient>(
            r#"
            UPDATE patients SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                health_insurance = COALESCE($4, health_insurance),
                birth_date = COALESCE($5, birth_date),
                has_cancer = COALESCE($6, has_cancer),
                has_marcapasos = COALESCE($7, has_marcapasos),
                uses_ea = COALESCE($8, uses_ea),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(patient_id)
        .bind(&request.full_name)
        .bind(&request.phone)
        .bind(&request.health_insurance)
        .bind(birth_date)
        .bind(request.has_cancer)
        .bind(request.has_marcapasos)
        .bind(request.uses_ea)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PatientError::NotFound)?;

        Ok(updated)
    }

    /// Patients that own appointments are never hard-deleted.
    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), PatientError> {
        let (appointment_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM appointments WHERE patient_id = $1")
                .bind(patient_id)
                .fetch_one(&self.pool)
                .await?;

        if appointment_count > 0 {
            return Err(PatientError::HasAppointments);
        }

        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(patient_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PatientError::NotFound);
        }

        info!("Patient deleted: {}", patient_id);
        Ok(())
    }

    async fn refresh(
        &self,
        patient_id: &Uuid,
        request: &UpsertPatientRequest,
        birth_date: Option<NaiveDate>,
    ) -> Result<Patient, PatientError> {
        let updated = sqlx::query_as::<_, Patient>(
            r#"
            UPDATE patients SET
                full_name = $2,
                phone = COALESCE($3, phone),
                health_insurance = COALESCE($4, health_insurance),
                birth_date = COALESCE($5, birth_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(patient_id)
        .bind(request.full_name.trim())
        .bind(&request.phone)
        .bind(&request.health_insurance)
        .bind(birth_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PatientError::NotFound)?;

        Ok(updated)
    }
}

fn parse_optional_day(raw: Option<&str>) -> Result<Option<NaiveDate>, PatientError> {
    match raw {
        None => Ok(None),
        Some(value) => parse_clinic_day(value)
            .map(Some)
            .map_err(|e| PatientError::ValidationError(e.to_string())),
    }
}
