// libs/appointment-cell/src/services/booking.rs
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Weekday};
use regex::Regex;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::models::Patient;
use patient_cell::services::PatientService;
use professional_cell::services::ProfessionalService;
use shared_database::{is_unique_violation, AppState};
use shared_utils::dates::parse_clinic_day;

use crate::models::{
    coerce_session_count, weekday_from_api, Appointment, AppointmentSearchQuery,
    AppointmentWithPatient, BookingError, CreateSeriesRequest, DbAppointment, PlaceOutcome,
    SeriesRequest, SlotAssignment,
};
use crate::services::allocator::{SlotAllocator, SlotStore};

pub struct BookingService {
    pool: PgPool,
    allocator: SlotAllocator,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            allocator: SlotAllocator::new(state.config.slot_scan_ceiling_days),
        }
    }

    /// Create a recurring booking: upsert the patient, resolve the treating
    /// professional, then let the allocator walk the calendar and persist the
    /// series. Each placement is committed before the next occupancy read, so
    /// sessions of one series can never collide with each other.
    pub async fn create_series(
        &self,
        request: CreateSeriesRequest,
    ) -> Result<Vec<AppointmentWithPatient>, BookingError> {
        let start_date = parse_clinic_day(&request.start_date)
            .map_err(|e| BookingError::ValidationError(e.to_string()))?;
        let time = parse_time_label(&request.time)?;
        let sessions = coerce_session_count(request.sessions.as_ref());
        let weekdays = resolve_weekdays(request.weekdays.as_deref())?;

        let patient_service = PatientService::with_pool(self.pool.clone());
        let patient = if let Some(patient_id) = request.patient_id {
            patient_service.get_patient(patient_id).await?
        } else if let Some(identity) = &request.patient {
            patient_service.upsert_by_dni(identity).await?
        } else {
            return Err(BookingError::ValidationError(
                "patient or patient_id is required".to_string(),
            ));
        };

        let professional_service = ProfessionalService::with_pool(self.pool.clone());
        let professional_id = professional_service.ensure_default().await?.id;

        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let series = SeriesRequest::new(start_date, time, weekdays, sessions);
        info!(
            "Booking {} sessions for patient {} starting {} at {}",
            series.sessions, patient.id, series.start_date, request.time
        );

        let store = PgSlotStore {
            pool: self.pool.clone(),
            patient_id: patient.id,
            professional_id,
            time,
            diagnosis,
            created: Mutex::new(Vec::new()),
        };

        let placed = self.allocator.allocate(&series, &store).await?;
        if (placed.len() as u32) < series.sessions {
            info!(
                "Booking for patient {} fulfilled partially: {} of {} sessions",
                patient.id,
                placed.len(),
                series.sessions
            );
        }

        let created_ids = store.created.into_inner().expect("created ids poisoned");
        let appointments = self.load_by_ids(&created_ids).await?;

        Ok(appointments
            .into_iter()
            .map(|appointment| AppointmentWithPatient {
                appointment,
                patient: patient.clone(),
            })
            .collect())
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentWithPatient, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let row = sqlx::query_as::<_, DbAppointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BookingError::NotFound)?;

        let mut joined = self.join_patients(vec![row]).await?;
        joined.pop().ok_or(BookingError::NotFound)
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<AppointmentWithPatient>, BookingError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut builder = QueryBuilder::new("SELECT * FROM appointments WHERE 1=1");
        if let Some(patient_id) = query.patient_id {
            builder.push(" AND patient_id = ");
            builder.push_bind(patient_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.to_string());
        }
        if let Some(from) = query.from {
            builder.push(" AND session_date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND session_date <= ");
            builder.push_bind(to);
        }
        builder.push(" ORDER BY session_date ASC, session_time ASC, slot_number ASC LIMIT ");
        builder.push_bind(query.limit.unwrap_or(200));

        let rows = builder
            .build_query_as::<DbAppointment>()
            .fetch_all(&self.pool)
            .await?;

        self.join_patients(rows).await
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), BookingError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound);
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    /// Cancellation sweep: drop a patient's future sessions that never
    /// happened. Completed appointments stay for the record.
    pub async fn cancel_upcoming(&self, patient_id: Uuid) -> Result<u64, BookingError> {
        let result = sqlx::query(
            r#"
            DELETE FROM appointments
            WHERE patient_id = $1
              AND session_date >= CURRENT_DATE
              AND status <> 'COMPLETED'
            "#,
        )
        .bind(patient_id)
        .execute(&self.pool)
        .await?;

        info!(
            "Cancelled {} upcoming appointments for patient {}",
            result.rows_affected(),
            patient_id
        );
        Ok(result.rows_affected())
    }

    async fn load_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, BookingError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, DbAppointment>(
            "SELECT * FROM appointments WHERE id = ANY($1) ORDER BY session_date ASC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn join_patients(
        &self,
        rows: Vec<DbAppointment>,
    ) -> Result<Vec<AppointmentWithPatient>, BookingError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let patient_ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.patient_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let patients = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ANY($1)")
            .bind(&patient_ids)
            .fetch_all(&self.pool)
            .await?;
        let by_id: HashMap<Uuid, Patient> =
            patients.into_iter().map(|p| (p.id, p)).collect();

        rows.into_iter()
            .map(|row| {
                let appointment = Appointment::from(row);
                let patient = by_id
                    .get(&appointment.patient_id)
                    .cloned()
                    .ok_or_else(|| {
                        BookingError::DatabaseError(
                            "appointment references a missing patient".to_string(),
                        )
                    })?;
                Ok(AppointmentWithPatient {
                    appointment,
                    patient,
                })
            })
            .collect()
    }
}

/// Store used in production: occupancy reads and placement writes go through
/// the appointments table, and the partial unique index on
/// (session_date, session_time, slot_number) reports lost races.
struct PgSlotStore {
    pool: PgPool,
    patient_id: Uuid,
    professional_id: Uuid,
    time: NaiveTime,
    diagnosis: Option<String>,
    created: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl SlotStore for PgSlotStore {
    async fn occupied_slots(
        &self,
        day: NaiveDate,
        time: NaiveTime,
    ) -> Result<BTreeSet<u8>, BookingError> {
        let rows = sqlx::query_as::<_, (i16,)>(
            r#"
            SELECT slot_number FROM appointments
            WHERE session_date = $1 AND session_time = $2 AND status <> 'CANCELLED'
            "#,
        )
        .bind(day)
        .bind(time)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(slot,)| slot as u8).collect())
    }

    async fn place(&self, assignment: &SlotAssignment) -> Result<PlaceOutcome, BookingError> {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO appointments
                (id, patient_id, professional_id, session_date, session_time,
                 slot_number, status, session_number, is_first_session, diagnosis)
            VALUES ($1, $2, $3, $4, $5, $6, 'SCHEDULED', $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(self.patient_id)
        .bind(self.professional_id)
        .bind(assignment.date)
        .bind(self.time)
        .bind(assignment.slot_number as i16)
        .bind(assignment.session_number as i32)
        .bind(assignment.is_first_session)
        .bind(&self.diagnosis)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                self.created.lock().expect("created ids poisoned").push(id);
                Ok(PlaceOutcome::Placed)
            }
            Err(err) if is_unique_violation(&err) => Ok(PlaceOutcome::SlotTaken),
            Err(err) => Err(err.into()),
        }
    }
}

fn resolve_weekdays(raw: Option<&[u8]>) -> Result<HashSet<Weekday>, BookingError> {
    let mut weekdays = HashSet::new();
    for value in raw.unwrap_or_default() {
        let weekday = weekday_from_api(*value).ok_or_else(|| {
            BookingError::ValidationError(format!("invalid weekday index: {}", value))
        })?;
        weekdays.insert(weekday);
    }
    Ok(weekdays)
}

fn parse_time_label(label: &str) -> Result<NaiveTime, BookingError> {
    let pattern = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("time label pattern");
    let trimmed = label.trim();

    if !pattern.is_match(trimmed) {
        return Err(BookingError::ValidationError(format!(
            "time must be an HH:mm label, got {:?}",
            label
        )));
    }

    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| BookingError::ValidationError(format!("invalid time label: {:?}", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_labels_are_validated() {
        assert_eq!(
            parse_time_label("10:00").unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert!(parse_time_label("24:00").is_err());
        assert!(parse_time_label("9:00").is_err());
        assert!(parse_time_label("10:65").is_err());
        assert!(parse_time_label("mediodía").is_err());
    }

    #[test]
    fn weekday_indexes_are_checked() {
        let weekdays = resolve_weekdays(Some(&[1, 3])).unwrap();
        assert!(weekdays.contains(&Weekday::Mon));
        assert!(weekdays.contains(&Weekday::Wed));

        assert!(resolve_weekdays(Some(&[9])).is_err());
        assert!(resolve_weekdays(None).unwrap().is_empty());
    }
}
