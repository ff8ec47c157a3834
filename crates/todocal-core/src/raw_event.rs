//! Raw event record from the calendar source.
//!
//! This module defines [`RawEvent`], a typed rendition of the event resource
//! returned by the calendar source. Field names follow the source's JSON
//! (camelCase), so records deserialize straight from an events page.
//!
//! Every field is optional at this level. Which ones are actually required is
//! decided when the record enters the core through
//! [`Event::from_raw`](crate::Event::from_raw).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Status value the source uses for cancelled events and instances.
pub const STATUS_CANCELLED: &str = "cancelled";

/// The start, end or original start of a raw event.
///
/// All-day events carry only `date` (`YYYY-MM-DD`). Timed events carry
/// `dateTime` (RFC 3339) and usually a `timeZone` name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    /// Calendar date for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// RFC 3339 timestamp for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// IANA zone the timestamp should be displayed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// Creates an all-day time from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Self::default()
        }
    }

    /// Creates a timed value from an RFC 3339 timestamp and an optional zone name.
    pub fn from_date_time(date_time: impl Into<String>, time_zone: Option<&str>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.into()),
            time_zone: time_zone.map(String::from),
        }
    }

    /// Returns true if this is an all-day value.
    pub fn is_all_day(&self) -> bool {
        self.date.is_some()
    }
}

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
    /// Anything the source reports that we do not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendee {
    /// The attendee's email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether this entry is the calendar owner.
    #[serde(rename = "self", default)]
    pub is_self: bool,
    /// Whether this attendee is a room or other resource.
    #[serde(default)]
    pub resource: bool,
    /// The attendee's response status.
    #[serde(default)]
    pub response_status: ResponseStatus,
}

impl RawAttendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Builder method to mark the attendee as the calendar owner.
    pub fn as_self(mut self) -> Self {
        self.is_self = true;
        self
    }

    /// Builder method to mark the attendee as a resource.
    pub fn as_resource(mut self) -> Self {
        self.resource = true;
        self
    }

    /// Builder method to set the response status.
    pub fn with_response(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }
}

/// Key-value metadata the source stores alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    /// Properties visible only on this copy of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<BTreeMap<String, String>>,
    /// Properties visible to all attendees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<BTreeMap<String, String>>,
}

/// Conference data associated with an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConferenceData {
    /// Entry points for joining the conference.
    #[serde(default)]
    pub entry_points: Vec<RawEntryPoint>,
}

/// An entry point for joining a conference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntryPoint {
    /// The type of entry point (e.g., "video", "phone", "sip").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point_type: Option<String>,
    /// The URI for this entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A raw calendar event as enumerated by the calendar source.
///
/// Master events carry `recurrence`; exception instances carry
/// `recurringEventId` and `originalStartTime`. Cancelled exception instances
/// may carry nothing beyond those two, their id and `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Identifier of the event, unique within the calendar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// The event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Event status: "confirmed", "tentative" or "cancelled".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Link to the event in the calendar UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    /// When the event starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RawEventTime>,

    /// When the event ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RawEventTime>,

    /// Rule lines (RRULE, EXDATE, RDATE) for recurring masters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,

    /// Id of the master event, set on exception instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,

    /// The slot an exception instance overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start_time: Option<RawEventTime>,

    /// Event attendees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<RawAttendee>,

    /// Synchronization metadata stored on the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,

    /// Video conference data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<RawConferenceData>,
}

impl RawEvent {
    /// Creates a raw event with an id and a start.
    ///
    /// The end defaults to the start; use [`RawEvent::with_end`] to change it.
    pub fn new(id: impl Into<String>, start: RawEventTime) -> Self {
        Self {
            id: Some(id.into()),
            end: Some(start.clone()),
            start: Some(start),
            status: Some("confirmed".to_string()),
            ..Self::default()
        }
    }

    /// Returns true if the source reports this event as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some(STATUS_CANCELLED)
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(RawEventTime::is_all_day)
    }

    /// Returns true if this record is an exception instance of a series.
    pub fn is_exception(&self) -> bool {
        self.recurring_event_id.is_some()
    }

    /// Returns the private extended properties, if any.
    pub fn private_properties(&self) -> Option<&BTreeMap<String, String>> {
        self.extended_properties
            .as_ref()
            .and_then(|props| props.private.as_ref())
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the end.
    pub fn with_end(mut self, end: RawEventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder method to set the recurrence lines.
    pub fn with_recurrence<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recurrence = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to mark this record as an exception instance.
    pub fn with_original_start(
        mut self,
        recurring_event_id: impl Into<String>,
        original_start: RawEventTime,
    ) -> Self {
        self.recurring_event_id = Some(recurring_event_id.into());
        self.original_start_time = Some(original_start);
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set a private extended property.
    pub fn with_private_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extended_properties
            .get_or_insert_with(ExtendedProperties::default)
            .private
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builder method to set a video conference link.
    pub fn with_video_link(mut self, uri: impl Into<String>) -> Self {
        self.conference_data
            .get_or_insert_with(RawConferenceData::default)
            .entry_points
            .push(RawEntryPoint {
                entry_point_type: Some("video".to_string()),
                uri: Some(uri.into()),
            });
        self
    }
}
