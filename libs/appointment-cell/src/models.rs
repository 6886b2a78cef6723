// libs/appointment-cell/src/models.rs
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use patient_cell::models::Patient;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub session_date: NaiveDate,
    pub session_time: NaiveTime,
    pub slot_number: i16,
    pub status: AppointmentStatus,
    pub session_number: i32,
    pub is_first_session: bool,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row image; status travels as its stored string.
#[derive(Debug, sqlx::FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub session_date: NaiveDate,
    pub session_time: NaiveTime,
    pub slot_number: i16,
    pub status: String,
    pub session_number: i32,
    pub is_first_session: bool,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbAppointment> for Appointment {
    fn from(row: DbAppointment) -> Self {
        Appointment {
            id: row.id,
            patient_id: row.patient_id,
            professional_id: row.professional_id,
            session_date: row.session_date,
            session_time: row.session_time,
            slot_number: row.slot_number,
            status: AppointmentStatus::from_db(&row.status),
            session_number: row.session_number,
            is_first_session: row.is_first_session,
            diagnosis: row.diagnosis,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "COMPLETED" => AppointmentStatus::Completed,
            "CANCELLED" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Scheduled,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Appointment plus the joined patient snapshot the client renders.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Patient,
}

// ==============================================================================
// BOOKING REQUEST MODELS
// ==============================================================================

pub const DEFAULT_SESSION_COUNT: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeriesRequest {
    /// Reference to an already known patient. Either this or `patient` must
    /// be present; the reference wins when both are.
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    /// Inline patient identity, upserted by dni.
    #[serde(default)]
    pub patient: Option<patient_cell::models::UpsertPatientRequest>,
    /// `YYYY-MM-DD` or ISO timestamp; normalized by the shared day rule.
    pub start_date: String,
    /// `HH:mm` slot label shared by every session of the series.
    pub time: String,
    pub diagnosis: Option<String>,
    /// Number or numeric string; anything else falls back to a single session.
    #[serde(default)]
    pub sessions: Option<Value>,
    /// Weekdays as the browser sends them: 0 = Sunday .. 6 = Saturday.
    #[serde(default)]
    pub weekdays: Option<Vec<u8>>,
}

/// Coerce the requested session count: absent means the standard ten-session
/// series, non-numeric input and anything below one collapse to one.
pub fn coerce_session_count(raw: Option<&Value>) -> u32 {
    let value = match raw {
        None | Some(Value::Null) => return DEFAULT_SESSION_COUNT,
        Some(value) => value,
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 1.0 => n.trunc() as u32,
        _ => 1,
    }
}

pub fn weekday_from_api(value: u8) -> Option<Weekday> {
    Some(match value {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => return None,
    })
}

// ==============================================================================
// ALLOCATOR MODELS
// ==============================================================================

/// One series to place: fixed time label, target weekdays, desired count.
#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub start_date: NaiveDate,
    pub time: NaiveTime,
    pub weekdays: HashSet<Weekday>,
    pub sessions: u32,
}

impl SeriesRequest {
    /// An empty weekday set defaults to the start date's weekday; a session
    /// count below one is never accepted.
    pub fn new(
        start_date: NaiveDate,
        time: NaiveTime,
        mut weekdays: HashSet<Weekday>,
        sessions: u32,
    ) -> Self {
        if weekdays.is_empty() {
            weekdays.insert(start_date.weekday());
        }
        Self {
            start_date,
            time,
            weekdays,
            sessions: sessions.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub date: NaiveDate,
    pub slot_number: u8,
    pub session_number: u32,
    pub is_first_session: bool,
}

/// Outcome of persisting one assignment. `SlotTaken` is a lost race on the
/// slot claim, reported by the store's unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    SlotTaken,
}

// ==============================================================================
// SEARCH MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}

impl From<patient_cell::models::PatientError> for BookingError {
    fn from(err: patient_cell::models::PatientError) -> Self {
        use patient_cell::models::PatientError;
        match err {
            PatientError::NotFound => BookingError::PatientNotFound,
            PatientError::ValidationError(msg) => BookingError::ValidationError(msg),
            other => BookingError::DatabaseError(other.to_string()),
        }
    }
}

impl From<professional_cell::models::ProfessionalError> for BookingError {
    fn from(err: professional_cell::models::ProfessionalError) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}

impl From<BookingError> for shared_models::error::AppError {
    fn from(err: BookingError) -> Self {
        use shared_models::error::AppError;
        match err {
            BookingError::NotFound | BookingError::PatientNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::ValidationError(msg) => AppError::ValidationError(msg),
            BookingError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_count_defaults_to_ten() {
        assert_eq!(coerce_session_count(None), 10);
        assert_eq!(coerce_session_count(Some(&Value::Null)), 10);
    }

    #[test]
    fn session_count_is_parsed_leniently() {
        assert_eq!(coerce_session_count(Some(&json!(4))), 4);
        assert_eq!(coerce_session_count(Some(&json!("6"))), 6);
        assert_eq!(coerce_session_count(Some(&json!(" 3 "))), 3);
        assert_eq!(coerce_session_count(Some(&json!(2.9))), 2);
    }

    #[test]
    fn bad_session_counts_collapse_to_one() {
        assert_eq!(coerce_session_count(Some(&json!(0))), 1);
        assert_eq!(coerce_session_count(Some(&json!(-3))), 1);
        assert_eq!(coerce_session_count(Some(&json!("diez"))), 1);
        assert_eq!(coerce_session_count(Some(&json!(true))), 1);
    }

    #[test]
    fn empty_weekday_set_defaults_to_start_weekday() {
        // 2025-03-10 is a Monday
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let request = SeriesRequest::new(start, time, HashSet::new(), 4);

        assert_eq!(request.weekdays.len(), 1);
        assert!(request.weekdays.contains(&Weekday::Mon));
    }

    #[test]
    fn weekday_numbering_is_sunday_based() {
        assert_eq!(weekday_from_api(0), Some(Weekday::Sun));
        assert_eq!(weekday_from_api(1), Some(Weekday::Mon));
        assert_eq!(weekday_from_api(6), Some(Weekday::Sat));
        assert_eq!(weekday_from_api(7), None);
    }

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(AppointmentStatus::from_db(&status.to_string()), status);
        }
    }
}
