//! Error types for the event model.
//!
//! Every fallible operation on [`Event`](crate::Event) returns an
//! [`EventResult`]. Failures here mean the calendar source handed us a record
//! we cannot reason about, so they are surfaced to the caller rather than
//! recovered from locally.

use thiserror::Error;

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// A recurrence rule that the rule grammar parser rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse recurrence for event '{event_id}': {message}")]
pub struct RecurrenceParseError {
    /// The event (master) whose rule failed to parse.
    pub event_id: String,
    /// The rule text as handed to the parser.
    pub rule: String,
    /// The parser's own description of the failure.
    pub message: String,
}

impl RecurrenceParseError {
    /// Creates a new parse error for the given event and rule text.
    pub fn new(
        event_id: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while building or querying events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The recurrence rule text is malformed.
    #[error(transparent)]
    RecurrenceParse(#[from] RecurrenceParseError),

    /// A field the calendar source must always provide is absent.
    #[error("event '{event_id}' is missing required field '{field}'")]
    MissingField {
        event_id: String,
        field: &'static str,
    },

    /// A date or date-time string could not be parsed.
    #[error("invalid {field} value '{value}': {message}")]
    InvalidTime {
        field: &'static str,
        value: String,
        message: String,
    },

    /// A timezone name that is not in the IANA database.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// An update tried to turn a timed event into an all-day one or back.
    #[error("event '{event_id}' cannot switch between all-day and timed")]
    AllDayChanged { event_id: String },
}

impl EventError {
    /// Creates a missing field error.
    pub fn missing_field(event_id: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            event_id: event_id.into(),
            field,
        }
    }

    /// Creates an invalid time error.
    pub fn invalid_time(
        field: &'static str,
        value: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::InvalidTime {
            field,
            value: value.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_parse_error_display() {
        let err = RecurrenceParseError::new("evt-1", "RRULE:FREQ=SOMETIMES", "invalid frequency");
        let display = err.to_string();
        assert!(display.contains("evt-1"));
        assert!(display.contains("invalid frequency"));
    }

    #[test]
    fn recurrence_parse_error_is_transparent() {
        let err: EventError = RecurrenceParseError::new("evt-1", "", "boom").into();
        assert!(matches!(err, EventError::RecurrenceParse(_)));
        assert_eq!(
            err.to_string(),
            "failed to parse recurrence for event 'evt-1': boom"
        );
    }

    #[test]
    fn missing_field_display() {
        let err = EventError::missing_field("evt-2", "start");
        assert_eq!(
            err.to_string(),
            "event 'evt-2' is missing required field 'start'"
        );
    }
}
