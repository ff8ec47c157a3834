//! Core types: calendar events, recurrence, next occurrence, descriptions

pub mod config;
pub mod describe;
pub mod error;
pub mod event;
pub mod raw_event;
pub mod recurrence;
pub mod time;
pub mod timezone;
pub mod tracing;

pub use config::{CalendarSettings, ConfigError, SyncConfig, TodoistSettings};
pub use describe::{describe, prose};
pub use error::{EventError, EventResult, RecurrenceParseError};
pub use event::{DurationUnit, Event, EventPatch, Occurrence, TaskDuration};
pub use raw_event::{
    ExtendedProperties, RawAttendee, RawConferenceData, RawEntryPoint, RawEvent, RawEventTime,
    ResponseStatus, STATUS_CANCELLED,
};
pub use recurrence::{Recurrence, normalize_lines};
pub use time::EventTime;
pub use timezone::{UTC_FALLBACK_ZONE, UTC_PLACEHOLDER, parse_timezone, resolve_timezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
