// libs/professional-cell/src/models.rs
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Professional {
    pub id: Uuid,
    pub full_name: String,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One weekly availability window. `day_of_week` counts from Monday (0) to
/// Sunday (6); the allocator never reads these, they only drive the agenda
/// view and staff configuration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkSchedule {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfessionalRequest {
    pub full_name: String,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfessionalRequest {
    pub full_name: Option<String>,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleWindow {
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Replaces the professional's whole weekly grid in one call.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceScheduleRequest {
    pub windows: Vec<ScheduleWindow>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfessionalError {
    #[error("Professional not found")]
    NotFound,

    #[error("Professional still owns appointments")]
    HasAppointments,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ProfessionalError {
    fn from(err: sqlx::Error) -> Self {
        ProfessionalError::DatabaseError(err.to_string())
    }
}

impl From<ProfessionalError> for shared_models::error::AppError {
    fn from(err: ProfessionalError) -> Self {
        use shared_models::error::AppError;
        match err {
            ProfessionalError::NotFound => AppError::NotFound(err.to_string()),
            ProfessionalError::HasAppointments => AppError::Conflict(err.to_string()),
            ProfessionalError::ValidationError(msg) => AppError::ValidationError(msg),
            ProfessionalError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

impl ScheduleWindow {
    pub fn validate(&self) -> Result<(), ProfessionalError> {
        if self.start_time >= self.end_time {
            return Err(ProfessionalError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }
        if !(0..=6).contains(&self.day_of_week) {
            return Err(ProfessionalError::ValidationError(
                "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a whole weekly grid: each window well-formed, no two windows on
/// the same day overlapping.
pub fn validate_windows(windows: &[ScheduleWindow]) -> Result<(), ProfessionalError> {
    for window in windows {
        window.validate()?;
    }

    for (i, a) in windows.iter().enumerate() {
        for b in &windows[i + 1..] {
            if a.day_of_week == b.day_of_week
                && a.start_time < b.end_time
                && b.start_time < a.end_time
            {
                return Err(ProfessionalError::ValidationError(format!(
                    "overlapping windows on day {}",
                    a.day_of_week
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(day: i16, start: (u32, u32), end: (u32, u32)) -> ScheduleWindow {
        ScheduleWindow {
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    #[test]
    fn windows_must_run_forward() {
        assert!(window(0, (9, 0), (13, 0)).validate().is_ok());
        assert!(window(0, (13, 0), (9, 0)).validate().is_err());
        assert!(window(0, (9, 0), (9, 0)).validate().is_err());
    }

    #[test]
    fn day_of_week_is_bounded() {
        assert!(window(6, (9, 0), (13, 0)).validate().is_ok());
        assert!(window(7, (9, 0), (13, 0)).validate().is_err());
        assert!(window(-1, (9, 0), (13, 0)).validate().is_err());
    }

    #[test]
    fn same_day_windows_must_not_overlap() {
        let grid = vec![window(0, (9, 0), (13, 0)), window(0, (12, 0), (16, 0))];
        assert!(validate_windows(&grid).is_err());

        let grid = vec![window(0, (9, 0), (13, 0)), window(0, (13, 0), (16, 0))];
        assert!(validate_windows(&grid).is_ok());

        let grid = vec![window(0, (9, 0), (13, 0)), window(1, (9, 0), (13, 0))];
        assert!(validate_windows(&grid).is_ok());
    }
}
