//! Time window resolution for feedback and cost queries.
//!
//! Windows come from three places, highest priority first:
//! 1. explicit `start_date` / `end_date` (YYYY-MM-DD or full ISO-8601)
//! 2. `hours` (cost path only)
//! 3. `days`, falling back to a per-command default
//!
//! Bare dates are treated as UTC; a bare end date is widened to the end of
//! that day so single-day windows include the whole day.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::error::{ApiError, ApiResult};

/// An inclusive UTC time range used for `updatedAt between` queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending now and starting `days` ago. Days below 1 are clamped.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self { start: end - Duration::days(days.max(1)), end }
    }

    /// Window ending now and starting `hours` ago. Hours below 1 are clamped.
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self { start: end - Duration::hours(hours.max(1)), end }
    }

    /// Resolve a window from the recognized configuration options.
    ///
    /// Explicit dates win over `hours`, which wins over `days`. When only an
    /// end date is given, the start is inferred from hours/days before it.
    pub fn resolve(
        days: Option<i64>,
        hours: Option<i64>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        default_days: i64,
    ) -> ApiResult<Self> {
        if let Some(d) = days
            && d < 1
        {
            return Err(ApiError::validation(format!("days must be >= 1, got {}", d)));
        }
        if let Some(h) = hours
            && h < 1
        {
            return Err(ApiError::validation(format!("hours must be >= 1, got {}", h)));
        }

        if start_date.is_some() || end_date.is_some() {
            let end = match end_date {
                Some(raw) => parse_datetime(raw, true)?,
                None => Utc::now(),
            };
            let start = match start_date {
                Some(raw) => parse_datetime(raw, false)?,
                None => match hours {
                    Some(h) => end - Duration::hours(h.max(1)),
                    None => end - Duration::days(days.unwrap_or(default_days).max(1)),
                },
            };
            if start > end {
                return Err(ApiError::validation(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
            return Ok(Self { start, end });
        }

        if let Some(h) = hours {
            return Ok(Self::last_hours(h));
        }

        Ok(Self::last_days(days.unwrap_or(default_days)))
    }

    /// RFC 3339 rendering of both endpoints, the form the remote expects.
    pub fn to_rfc3339(&self) -> (String, String) {
        (
            self.start.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            self.end.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        )
    }
}

/// Parse YYYY-MM-DD or a full ISO-8601 datetime. Bare end dates are pushed
/// to 23:59:59.999999 so the day is fully covered.
fn parse_datetime(raw: &str, is_end: bool) -> ApiResult<DateTime<Utc>> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = value.parse::<chrono::NaiveDateTime>() {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = value.parse::<NaiveDate>() {
        let time = if is_end {
            date.and_hms_micro_opt(23, 59, 59, 999_999)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(naive) = time {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(ApiError::validation(format!("invalid date: {}", raw)))
}
