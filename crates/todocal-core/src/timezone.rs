//! Timezone resolution for event times.
//!
//! The calendar source reports bare `UTC` when the zone is unspecified, not
//! when the event really lives in UTC. Such values are mapped to
//! [`UTC_FALLBACK_ZONE`] so local display stays correct.

use chrono_tz::Tz;

use crate::error::{EventError, EventResult};

/// Zone name the source uses as an "unspecified" placeholder.
pub const UTC_PLACEHOLDER: &str = "UTC";

/// Zone that replaces the `UTC` placeholder.
pub const UTC_FALLBACK_ZONE: Tz = chrono_tz::Europe::London;

/// Parses an IANA zone name.
///
/// # Errors
///
/// Returns [`EventError::UnknownTimezone`] if the name is not in the database.
pub fn parse_timezone(name: &str) -> EventResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| EventError::UnknownTimezone(name.to_string()))
}

/// Resolves the zone of a timed value.
///
/// Uses the record's own zone name when present and `default` otherwise. A
/// resulting zone of `UTC` is replaced by [`UTC_FALLBACK_ZONE`].
pub fn resolve_timezone(zone: Option<&str>, default: Tz) -> EventResult<Tz> {
    let tz = match zone {
        Some(UTC_PLACEHOLDER) => return Ok(UTC_FALLBACK_ZONE),
        Some(name) => parse_timezone(name)?,
        None => default,
    };

    if tz == Tz::UTC {
        Ok(UTC_FALLBACK_ZONE)
    } else {
        Ok(tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_placeholder_maps_to_london() {
        let tz = resolve_timezone(Some("UTC"), chrono_tz::America::New_York).unwrap();
        assert_eq!(tz, chrono_tz::Europe::London);
    }

    #[test]
    fn explicit_zone_wins_over_default() {
        let tz = resolve_timezone(Some("Asia/Tokyo"), chrono_tz::America::New_York).unwrap();
        assert_eq!(tz, chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn missing_zone_uses_default() {
        let tz = resolve_timezone(None, chrono_tz::America::New_York).unwrap();
        assert_eq!(tz, chrono_tz::America::New_York);
    }

    #[test]
    fn utc_default_is_remapped_too() {
        let tz = resolve_timezone(None, Tz::UTC).unwrap();
        assert_eq!(tz, UTC_FALLBACK_ZONE);
    }

    #[test]
    fn etc_utc_is_not_a_placeholder() {
        let tz = resolve_timezone(Some("Etc/UTC"), Tz::UTC).unwrap();
        assert_eq!(tz, chrono_tz::Etc::UTC);
    }

    #[test]
    fn unknown_zone_is_an_error() {
        let err = resolve_timezone(Some("Mars/Olympus_Mons"), Tz::UTC).unwrap_err();
        assert!(matches!(err, EventError::UnknownTimezone(name) if name == "Mars/Olympus_Mons"));
    }
}
