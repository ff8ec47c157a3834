//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times,
//! which are either a zoned instant or an all-day calendar date, and the
//! shape normalization used when comparing times across a series.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{EventError, EventResult};
use crate::raw_event::RawEventTime;
use crate::timezone::resolve_timezone;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific instant, kept in its resolved display zone
/// - **AllDay**: A date without a time of day or zone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTime {
    /// A specific instant in its display zone.
    DateTime(DateTime<Tz>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Parses a raw start/end/original-start value.
    ///
    /// Timed values are placed in the zone resolved from the record's own
    /// `timeZone`, falling back to `default_tz`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTime`] if neither `date` nor `dateTime`
    /// parses, or [`EventError::UnknownTimezone`] for an unknown zone name.
    pub fn from_raw(raw: &RawEventTime, field: &'static str, default_tz: Tz) -> EventResult<Self> {
        if let Some(ref date) = raw.date {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| EventError::invalid_time(field, date.as_str(), e))?;
            return Ok(Self::AllDay(parsed));
        }

        let Some(ref date_time) = raw.date_time else {
            return Err(EventError::invalid_time(
                field,
                "",
                "neither date nor dateTime is set",
            ));
        };

        let parsed = DateTime::parse_from_rfc3339(date_time)
            .map_err(|e| EventError::invalid_time(field, date_time.as_str(), e))?;
        let tz = resolve_timezone(raw.time_zone.as_deref(), default_tz)?;
        Ok(Self::DateTime(parsed.with_timezone(&tz)))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Creates a new `EventTime::DateTime` from an instant in any zone.
    pub fn from_zoned(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the instant if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Tz>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the date if this is an `AllDay` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Returns the display zone of a timed value.
    pub fn timezone(&self) -> Option<Tz> {
        self.as_datetime().map(DateTime::timezone)
    }

    /// Returns the calendar date, local to the value's own zone.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Converts this value to the shape of `template`.
    ///
    /// Instants become dates (in their own zone) when the template is all-day;
    /// dates become local midnight in the template's zone when it is timed;
    /// instants are moved into the template's zone.
    pub fn shaped_like(&self, template: &EventTime) -> EventTime {
        match (self, template) {
            (Self::AllDay(date), Self::AllDay(_)) => Self::AllDay(*date),
            (Self::DateTime(dt), Self::AllDay(_)) => Self::AllDay(dt.date_naive()),
            (Self::DateTime(dt), Self::DateTime(shape)) => {
                Self::DateTime(dt.with_timezone(&shape.timezone()))
            }
            (Self::AllDay(date), Self::DateTime(shape)) => {
                Self::DateTime(local_midnight(*date, shape.timezone()))
            }
        }
    }

    /// The key used for ordering: the UTC instant, with dates at midnight UTC.
    fn sort_key(&self) -> NaiveDateTime {
        match self {
            Self::DateTime(dt) => dt.naive_utc(),
            Self::AllDay(date) => date.and_time(NaiveTime::MIN),
        }
    }
}

/// Midnight at the start of `date` in `tz`.
///
/// Zones that skip midnight on a transition day get the instant the UTC
/// midnight of that date maps to.
pub(crate) fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

impl From<NaiveDate> for EventTime {
    fn from(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }
}

impl From<DateTime<Tz>> for EventTime {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.with_timezone(&Tz::UTC))
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.is_all_day().cmp(&other.is_all_day()).reverse())
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllDay(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%:z")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn zoned(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parse_all_day() {
        let raw = RawEventTime::from_date(date(2024, 1, 3));
        let et = EventTime::from_raw(&raw, "start", Tz::UTC).unwrap();
        assert_eq!(et, EventTime::AllDay(date(2024, 1, 3)));
        assert!(et.is_all_day());
        assert_eq!(et.timezone(), None);
    }

    #[test]
    fn parse_timed_in_record_zone() {
        let raw = RawEventTime::from_date_time("2024-01-03T08:00:00Z", Some("Europe/Paris"));
        let et = EventTime::from_raw(&raw, "start", Tz::UTC).unwrap();
        let dt = et.as_datetime().unwrap();
        assert_eq!(dt.timezone(), chrono_tz::Europe::Paris);
        assert_eq!(dt.format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn parse_timed_with_utc_placeholder() {
        let raw = RawEventTime::from_date_time("2024-07-01T08:00:00Z", Some("UTC"));
        let et = EventTime::from_raw(&raw, "start", chrono_tz::Asia::Tokyo).unwrap();
        assert_eq!(et.timezone(), Some(chrono_tz::Europe::London));
    }

    #[test]
    fn parse_timed_falls_back_to_default_zone() {
        let raw = RawEventTime::from_date_time("2024-01-03T14:00:00Z", None);
        let et = EventTime::from_raw(&raw, "start", chrono_tz::America::New_York).unwrap();
        assert_eq!(et.timezone(), Some(chrono_tz::America::New_York));
        assert_eq!(et.date(), date(2024, 1, 3));
    }

    #[test]
    fn parse_rejects_garbage() {
        let raw = RawEventTime::from_date_time("yesterday", None);
        let err = EventTime::from_raw(&raw, "end", Tz::UTC).unwrap_err();
        assert!(matches!(err, EventError::InvalidTime { field: "end", .. }));

        let err = EventTime::from_raw(&RawEventTime::default(), "start", Tz::UTC).unwrap_err();
        assert!(matches!(err, EventError::InvalidTime { field: "start", .. }));
    }

    #[test]
    fn shape_instant_as_date() {
        let ny = chrono_tz::America::New_York;
        let et = EventTime::from(zoned(ny, 2024, 1, 2, 23, 30));
        let shaped = et.shaped_like(&EventTime::AllDay(date(2024, 1, 1)));
        assert_eq!(shaped, EventTime::AllDay(date(2024, 1, 2)));
    }

    #[test]
    fn shape_date_as_instant() {
        let paris = chrono_tz::Europe::Paris;
        let template = EventTime::from(zoned(paris, 2024, 1, 1, 9, 0));
        let shaped = EventTime::AllDay(date(2024, 1, 2)).shaped_like(&template);
        assert_eq!(shaped, EventTime::from(zoned(paris, 2024, 1, 2, 0, 0)));
        assert_eq!(shaped.timezone(), Some(paris));
    }

    #[test]
    fn shape_instant_into_other_zone() {
        let template = EventTime::from(zoned(chrono_tz::Europe::Paris, 2024, 1, 1, 9, 0));
        let shaped = EventTime::from(zoned(Tz::UTC, 2024, 1, 4, 14, 0)).shaped_like(&template);
        assert_eq!(shaped.timezone(), Some(chrono_tz::Europe::Paris));
        assert_eq!(
            shaped.as_datetime().unwrap().format("%H:%M").to_string(),
            "15:00"
        );
    }

    #[test]
    fn equality_is_instant_based() {
        let a = EventTime::from(zoned(Tz::UTC, 2024, 1, 4, 14, 0));
        let b = EventTime::from(zoned(chrono_tz::Europe::Paris, 2024, 1, 4, 15, 0));
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn ordering() {
        let et1 = EventTime::from(zoned(Tz::UTC, 2025, 2, 5, 10, 0));
        let et2 = EventTime::from(zoned(Tz::UTC, 2025, 2, 5, 11, 0));
        let et3 = EventTime::AllDay(date(2025, 2, 5));
        let midnight = EventTime::from(zoned(Tz::UTC, 2025, 2, 5, 0, 0));

        assert!(et3 < et1);
        assert!(et1 < et2);
        assert!(et3 < midnight);
        assert_ne!(et3, midnight);
    }

    #[test]
    fn display() {
        assert_eq!(EventTime::AllDay(date(2024, 6, 14)).to_string(), "2024-06-14");
        let et = EventTime::from(zoned(chrono_tz::Europe::Paris, 2024, 1, 4, 15, 0));
        assert_eq!(et.to_string(), "2024-01-04T15:00:00+01:00");
    }
}
