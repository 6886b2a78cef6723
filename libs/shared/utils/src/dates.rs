use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid calendar day: {0}")]
pub struct InvalidClinicDay(pub String);

/// Parse a calendar day from the wire.
///
/// Accepts a date-only string (`2025-03-10`) or an RFC 3339 timestamp. A
/// timestamp at exactly UTC midnight means "that calendar day", never the
/// previous day in a negative-offset locale; any other instant resolves to
/// its UTC calendar day. Appointment dates and birth dates both cross this
/// boundary, so everything downstream works in NaiveDate and the day can no
/// longer shift.
pub fn parse_clinic_day(raw: &str) -> Result<NaiveDate, InvalidClinicDay> {
    let trimmed = raw.trim();

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }

    let instant = DateTime::parse_from_rfc3339(trimmed)
        .map_err(|_| InvalidClinicDay(raw.to_string()))?
        .with_timezone(&Utc);

    Ok(instant.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_and_utc_midnight_agree() {
        let from_date = parse_clinic_day("2025-03-10").unwrap();
        let from_timestamp = parse_clinic_day("2025-03-10T00:00:00Z").unwrap();

        assert_eq!(from_date, from_timestamp);
        assert_eq!(from_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn offset_timestamp_resolves_to_utc_day() {
        // 21:00 -03:00 is already the next day in UTC
        let day = parse_clinic_day("2025-03-09T21:00:00-03:00").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_clinic_day("10/03/2025").is_err());
        assert!(parse_clinic_day("not a day").is_err());
    }
}
