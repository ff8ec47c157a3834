//! The calendar event model.
//!
//! An [`Event`] wraps the last [`RawEvent`] seen from the calendar source and
//! layers local state on top of it: an editable summary and private
//! properties, which are diffed against the raw snapshot when saving. A
//! recurring master also owns its exception instances, the per-occurrence
//! overrides of the series.
//!
//! The main query is [`Event::next_occurrence`], which merges the slots
//! generated by the recurrence rule with the exceptions to find the next
//! occurrence the user will actually attend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::describe::describe;
use crate::error::{EventError, EventResult};
use crate::raw_event::{ExtendedProperties, RawAttendee, RawEvent, ResponseStatus};
use crate::recurrence::Recurrence;
use crate::time::EventTime;

/// A calendar event, either a single event, a recurring master or an
/// exception instance of a series.
#[derive(Debug)]
pub struct Event {
    id: String,
    default_tz: Tz,
    raw: RawEvent,
    summary: Option<String>,
    extended_properties: Option<ExtendedProperties>,
    recurring_event_id: Option<String>,
    exceptions: HashMap<String, Event>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    original_start: Option<EventTime>,
}

/// The next occurrence of a series and the event it belongs to.
#[derive(Debug)]
pub struct Occurrence<'a> {
    /// When the occurrence starts, in the series' shape and zone.
    pub start: EventTime,
    /// The master event, or the exception instance that overrides the slot.
    pub event: &'a Event,
}

/// Fields of an event that differ from the last synced record.
///
/// Serializes to the partial record accepted by the source's update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

impl EventPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.extended_properties.is_none()
    }
}

/// Unit of a task duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Day,
    Minute,
}

/// Duration of an event as a task manager expects it: whole days for
/// all-day events, minutes otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDuration {
    pub amount: i64,
    pub unit: DurationUnit,
}

impl Event {
    /// Builds an event from a raw record.
    ///
    /// `default_tz` is the calendar's configured zone, used for timed values
    /// that carry no zone of their own and for all-day `UNTIL` bounds.
    ///
    /// # Errors
    ///
    /// Fails when `id` is absent, when `start` is absent on a record that is
    /// not cancelled, when an exception instance has no `originalStartTime`,
    /// or when a time value cannot be parsed.
    pub fn from_raw(raw: &RawEvent, default_tz: Tz) -> EventResult<Self> {
        let id = raw
            .id
            .clone()
            .ok_or_else(|| EventError::missing_field("", "id"))?;

        let mut event = Self {
            id,
            default_tz,
            raw: RawEvent::default(),
            summary: None,
            extended_properties: None,
            recurring_event_id: None,
            exceptions: HashMap::new(),
            start: None,
            end: None,
            original_start: None,
        };
        event.update_from_raw(raw)?;
        Ok(event)
    }

    /// Replaces the raw snapshot with a fresh record from the source.
    ///
    /// Local edits to the summary and private properties are discarded in
    /// favour of the record's values. The id never changes.
    ///
    /// # Errors
    ///
    /// Same validation as [`Event::from_raw`], plus
    /// [`EventError::AllDayChanged`] if the record flips between all-day and
    /// timed. The event is left untouched on error.
    pub fn update_from_raw(&mut self, raw: &RawEvent) -> EventResult<()> {
        let start = match raw.start {
            Some(ref start) => Some(EventTime::from_raw(start, "start", self.default_tz)?),
            None if raw.is_cancelled() => None,
            None => return Err(EventError::missing_field(self.id.as_str(), "start")),
        };

        if let (Some(old), Some(new)) = (&self.start, &start) {
            if old.is_all_day() != new.is_all_day() {
                return Err(EventError::AllDayChanged {
                    event_id: self.id.clone(),
                });
            }
        }

        let end = raw
            .end
            .as_ref()
            .map(|end| EventTime::from_raw(end, "end", self.default_tz))
            .transpose()?;

        let original_start = match raw.original_start_time {
            Some(ref original) => Some(EventTime::from_raw(
                original,
                "originalStartTime",
                self.default_tz,
            )?),
            None if raw.is_exception() => {
                return Err(EventError::missing_field(
                    self.id.as_str(),
                    "originalStartTime",
                ));
            }
            None => None,
        };

        self.raw = raw.clone();
        self.summary = raw.summary.clone();
        self.extended_properties = raw.extended_properties.clone();
        if raw.recurring_event_id.is_some() {
            self.recurring_event_id = raw.recurring_event_id.clone();
        }
        self.start = start;
        self.end = end;
        self.original_start = original_start;

        trace!(event_id = %self.id, "refreshed event from raw record");
        Ok(())
    }

    /// Inserts or refreshes an exception instance of this series.
    ///
    /// # Errors
    ///
    /// Fails when the record has no id or no `originalStartTime`, or for any
    /// reason [`Event::from_raw`] would.
    pub fn update_exception(&mut self, raw: &RawEvent) -> EventResult<()> {
        let id = raw
            .id
            .as_deref()
            .ok_or_else(|| EventError::missing_field("", "id"))?;
        if raw.original_start_time.is_none() {
            return Err(EventError::missing_field(id, "originalStartTime"));
        }

        if let Some(existing) = self.exceptions.get_mut(id) {
            existing.update_from_raw(raw)?;
            debug!(event_id = %self.id, exception_id = id, "refreshed exception");
            return Ok(());
        }

        let mut exception = Event::from_raw(raw, self.default_tz)?;
        exception.recurring_event_id = Some(self.id.clone());

        if self
            .exceptions
            .values()
            .any(|other| other.original_start == exception.original_start)
        {
            warn!(
                event_id = %self.id,
                exception_id = id,
                "two exceptions override the same slot"
            );
        }

        debug!(event_id = %self.id, exception_id = id, "added exception");
        self.exceptions.insert(id.to_string(), exception);
        Ok(())
    }

    /// Returns an independent copy rebuilt from the raw snapshots.
    ///
    /// The copy has the same id, raw record and exceptions. Unsaved local
    /// edits are not carried over.
    pub fn deep_copy(&self) -> Event {
        Event {
            id: self.id.clone(),
            default_tz: self.default_tz,
            raw: self.raw.clone(),
            summary: self.raw.summary.clone(),
            extended_properties: self.raw.extended_properties.clone(),
            recurring_event_id: self.recurring_event_id.clone(),
            exceptions: self
                .exceptions
                .iter()
                .map(|(id, exception)| (id.clone(), exception.deep_copy()))
                .collect(),
            start: self.start.clone(),
            end: self.end.clone(),
            original_start: self.original_start.clone(),
        }
    }

    /// Stores a value in the event's private properties.
    pub fn save_private_info(&mut self, key: impl Into<String>, value: impl ToString) {
        self.extended_properties
            .get_or_insert_with(ExtendedProperties::default)
            .private
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.to_string());
    }

    /// Reads a value from the event's private properties.
    pub fn get_private_info(&self, key: &str) -> Option<&str> {
        self.extended_properties
            .as_ref()
            .and_then(|props| props.private.as_ref())
            .and_then(|private| private.get(key))
            .map(String::as_str)
    }

    /// Returns the changes to push to the source, if any.
    pub fn pending_changes(&self) -> Option<EventPatch> {
        let mut patch = EventPatch::default();
        if self.summary != self.raw.summary {
            patch.summary = self.summary.clone();
        }
        if self.extended_properties != self.raw.extended_properties {
            patch.extended_properties = self.extended_properties.clone();
        }
        (!patch.is_empty()).then_some(patch)
    }

    /// Records that the pending changes were accepted by the source.
    pub fn mark_saved(&mut self) {
        self.raw.summary = self.summary.clone();
        self.raw.extended_properties = self.extended_properties.clone();
    }

    /// Returns the next occurrence strictly after `after`.
    ///
    /// `after` is first converted to the shape of the event's start (a date
    /// for all-day events). Occurrences the user declined, or that everyone
    /// else declined, are skipped, and so are cancelled exceptions.
    ///
    /// # Errors
    ///
    /// Fails when the event has no start or its recurrence rule is malformed.
    pub fn next_occurrence(
        &self,
        after: impl Into<EventTime>,
    ) -> EventResult<Option<Occurrence<'_>>> {
        let start = self.start()?;
        let after = after.into().shaped_like(start);

        let Some(recurrence) = self.recurrence()? else {
            if after < *start && !self.is_declined() {
                return Ok(Some(Occurrence {
                    start: start.clone(),
                    event: self,
                }));
            }
            return Ok(None);
        };

        Ok(self
            .find_next_occurrence(&recurrence, start, &after)
            .map(|(time, event)| Occurrence {
                start: time.shaped_like(start),
                event,
            }))
    }

    fn find_next_occurrence(
        &self,
        recurrence: &Recurrence,
        start: &EventTime,
        after: &EventTime,
    ) -> Option<(EventTime, &Event)> {
        let first_exception = self
            .exceptions
            .values()
            .filter(|exception| !exception.is_cancelled() && !exception.is_declined())
            .filter_map(|exception| {
                let exception_start = exception.start.as_ref()?.shaped_like(start);
                (exception_start > *after).then_some((exception_start, exception))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        if self.is_declined() {
            debug!(event_id = %self.id, "series declined, only exceptions qualify");
            return first_exception;
        }

        let overridden: HashSet<EventTime> = self
            .exceptions
            .values()
            .filter_map(|exception| exception.original_start.as_ref())
            .map(|original| original.shaped_like(start))
            .collect();

        let forwarded = recurrence.fast_forward(after);
        let recurrence = forwarded.as_ref().unwrap_or(recurrence);
        for occurrence in recurrence.occurrences_after(after) {
            if first_exception
                .as_ref()
                .is_some_and(|(exception_start, _)| *exception_start <= occurrence)
            {
                return first_exception;
            }
            if overridden.contains(&occurrence) {
                trace!(event_id = %self.id, %occurrence, "slot overridden by exception");
                continue;
            }
            return Some((occurrence, self));
        }

        first_exception
    }

    /// The recurrence rule of a master event, anchored at its start.
    ///
    /// The rule is parsed on every call.
    ///
    /// # Errors
    ///
    /// Fails when the rule is malformed or the event has no start.
    pub fn recurrence(&self) -> EventResult<Option<Recurrence>> {
        let Some(lines) = self.raw.recurrence.as_deref().filter(|lines| !lines.is_empty()) else {
            return Ok(None);
        };
        let recurrence = Recurrence::parse(&self.id, lines, self.start()?, self.default_tz)?;
        Ok(Some(recurrence))
    }

    /// The final occurrence of a finite series.
    pub fn last_occurrence(&self) -> EventResult<Option<EventTime>> {
        Ok(self
            .recurrence()?
            .and_then(|recurrence| recurrence.last_occurrence()))
    }

    /// Describes the series in English, e.g. `every week on Monday at 09:00`.
    ///
    /// Returns `None` for events that do not repeat.
    pub fn recurrence_string(&self) -> EventResult<Option<String>> {
        Ok(self.recurrence()?.and_then(|recurrence| describe(&recurrence)))
    }

    /// Returns true if the event has a recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.raw
            .recurrence
            .as_ref()
            .is_some_and(|lines| !lines.is_empty())
    }

    /// Returns true if the source reports this event as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.raw.is_cancelled()
    }

    /// The response of the attendee flagged as the calendar owner.
    pub fn response_status(&self) -> Option<ResponseStatus> {
        self.raw
            .attendees
            .iter()
            .find(|attendee| attendee.is_self)
            .map(|attendee| attendee.response_status)
    }

    /// Returns true if the calendar owner declined.
    pub fn is_declined_by_me(&self) -> bool {
        self.response_status() == Some(ResponseStatus::Declined)
    }

    /// Returns true if every other human attendee declined.
    ///
    /// Resources (rooms, equipment) do not count, and an event without other
    /// attendees is never declined by others.
    pub fn is_declined_by_others(&self) -> bool {
        let mut others = self
            .raw
            .attendees
            .iter()
            .filter(|attendee| !attendee.is_self && !attendee.resource)
            .peekable();
        others.peek().is_some()
            && others.all(|attendee| attendee.response_status == ResponseStatus::Declined)
    }

    fn is_declined(&self) -> bool {
        self.is_declined_by_me() || self.is_declined_by_others()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The last record seen from the source.
    pub fn raw(&self) -> &RawEvent {
        &self.raw
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    /// The calendar's default zone this event was built with.
    pub fn default_timezone(&self) -> Tz {
        self.default_tz
    }

    /// Id of the master event, for exception instances.
    pub fn recurring_event_id(&self) -> Option<&str> {
        self.recurring_event_id.as_deref()
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &Event> {
        self.exceptions.values()
    }

    pub fn exception(&self, id: &str) -> Option<&Event> {
        self.exceptions.get(id)
    }

    pub fn exception_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.exceptions.get_mut(id)
    }

    /// When the event starts.
    ///
    /// # Errors
    ///
    /// Only cancelled records may lack a start; for those this returns
    /// [`EventError::MissingField`].
    pub fn start(&self) -> EventResult<&EventTime> {
        self.start
            .as_ref()
            .ok_or_else(|| EventError::missing_field(self.id.as_str(), "start"))
    }

    pub fn end(&self) -> Option<&EventTime> {
        self.end.as_ref()
    }

    /// The slot an exception instance overrides.
    pub fn original_start(&self) -> Option<&EventTime> {
        self.original_start.as_ref()
    }

    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(EventTime::is_all_day)
    }

    /// Length of the event in whole minutes.
    pub fn duration(&self) -> Option<i64> {
        let (start, end) = (self.start.as_ref()?, self.end.as_ref()?);
        Some(span(start, end).num_minutes())
    }

    /// Length of the event in days for all-day events, in minutes otherwise.
    pub fn task_duration(&self) -> Option<TaskDuration> {
        let minutes = self.duration()?;
        Some(if self.is_all_day() {
            TaskDuration {
                amount: minutes / (60 * 24),
                unit: DurationUnit::Day,
            }
        } else {
            TaskDuration {
                amount: minutes,
                unit: DurationUnit::Minute,
            }
        })
    }

    pub fn attendees(&self) -> &[RawAttendee] {
        &self.raw.attendees
    }

    /// The event description, empty when the record has none.
    pub fn description(&self) -> &str {
        self.raw.description.as_deref().unwrap_or_default()
    }

    pub fn html_link(&self) -> Option<&str> {
        self.raw.html_link.as_deref()
    }

    /// URI of the first video entry point of the conference data.
    pub fn conference_link(&self) -> Option<&str> {
        self.raw
            .conference_data
            .as_ref()?
            .entry_points
            .iter()
            .filter(|entry| entry.entry_point_type.as_deref() == Some("video"))
            .find_map(|entry| entry.uri.as_deref())
    }
}

fn span(start: &EventTime, end: &EventTime) -> TimeDelta {
    match (start, end.shaped_like(start)) {
        (EventTime::AllDay(start), EventTime::AllDay(end)) => end - *start,
        (EventTime::DateTime(start), EventTime::DateTime(end)) => end - *start,
        _ => TimeDelta::zero(),
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cancelled = if self.is_cancelled() { "cancelled|" } else { "" };
        write!(
            f,
            "{}: {}{}, ",
            self.id,
            cancelled,
            self.summary.as_deref().unwrap_or_default()
        )?;
        match self.start {
            Some(ref start) => write!(f, "{start}")?,
            None => f.write_str("-")?,
        }
        match self.raw.recurrence {
            Some(ref lines) => write!(f, ", {}", lines.join(" ")),
            None => Ok(()),
        }
    }
}
