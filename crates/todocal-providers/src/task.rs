//! Task items mirrored from calendar events.
//!
//! A [`TaskItem`] keeps the last [`RawTask`] seen from the task sink next to
//! its local edits, the same way an event keeps its raw record. Saving sends
//! only what changed, or creates the task when it was never saved.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::sink::TaskSink;

/// Priority given to new tasks.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Due specification of a task.
///
/// Either a free-text `string` the task manager parses (e.g. `every week on
/// Monday at 09:00`) or an explicit `date` (`YYYY-MM-DD` or
/// `YYYY-MM-DDTHH:MM:SS`, optionally with a trailing `Z`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Due {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Due {
    pub fn from_string(string: impl Into<String>) -> Self {
        Self {
            string: Some(string.into()),
            ..Self::default()
        }
    }
}

/// A task record as returned by the task sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: String,
    pub content: String,
    pub project_id: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub due: Option<Due>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// A task to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub content: String,
    pub project_id: String,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
}

/// Fields of a task that differ from the last synced record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.priority.is_none() && self.due.is_none()
    }
}

/// A task in the task manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    id: Option<String>,
    pub content: String,
    pub project_id: String,
    pub priority: u8,
    due: Option<Due>,
    raw: Option<RawTask>,
}

impl TaskItem {
    /// Creates a task that has not been saved yet.
    pub fn new(content: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            project_id: project_id.into(),
            priority: DEFAULT_PRIORITY,
            due: None,
            raw: None,
        }
    }

    pub fn from_raw(raw: RawTask) -> Self {
        let mut item = Self::new(raw.content.clone(), raw.project_id.clone());
        item.update_from_raw(raw);
        item
    }

    /// Replaces local state with a fresh record from the sink.
    pub fn update_from_raw(&mut self, raw: RawTask) {
        self.id = Some(raw.id.clone());
        self.content = raw.content.clone();
        self.project_id = raw.project_id.clone();
        self.priority = raw.priority;
        self.due = raw.due.clone();
        self.raw = Some(raw);
    }

    /// The sink's id, once the task has been saved.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn raw(&self) -> Option<&RawTask> {
        self.raw.as_ref()
    }

    pub fn due(&self) -> Option<&Due> {
        self.due.as_ref()
    }

    /// Parses the explicit due date.
    ///
    /// Date-only values come back at midnight.
    ///
    /// # Errors
    ///
    /// Returns an invalid task error when the date is not in one of the
    /// accepted formats.
    pub fn next_due_date(&self) -> ProviderResult<Option<NaiveDateTime>> {
        let Some(date) = self.due.as_ref().and_then(|due| due.date.as_deref()) else {
            return Ok(None);
        };
        let invalid = |e: chrono::ParseError| {
            ProviderError::invalid_task(format!("invalid due date '{date}'")).with_source(e)
        };

        let trimmed = date.strip_suffix('Z').unwrap_or(date);
        let parsed = if trimmed.contains('T') {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map_err(invalid)?
        } else {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map_err(invalid)?
                .and_time(NaiveTime::MIN)
        };
        Ok(Some(parsed))
    }

    pub fn is_recurring(&self) -> bool {
        self.due.as_ref().is_some_and(|due| due.is_recurring)
    }

    /// The free-text due string, if any.
    pub fn due_string(&self) -> Option<&str> {
        self.due.as_ref().and_then(|due| due.string.as_deref())
    }

    /// Replaces the due settings with a free-text string.
    pub fn set_due_by_string(&mut self, due_string: impl Into<String>) {
        self.due = Some(Due::from_string(due_string));
    }

    /// Sets an explicit due date, keeping the rest of the due settings.
    pub fn set_next_occurrence(&mut self, at: NaiveDateTime, include_time: bool) {
        let format = if include_time {
            "%Y-%m-%dT%H:%M:%S"
        } else {
            "%Y-%m-%d"
        };
        self.due.get_or_insert_with(Due::default).date = Some(at.format(format).to_string());
    }

    /// Returns the changes to push to the sink, if any.
    ///
    /// A task that was never saved has no baseline and reports no changes.
    pub fn pending_changes(&self) -> Option<TaskPatch> {
        let raw = self.raw.as_ref()?;
        let mut patch = TaskPatch::default();
        if self.content != raw.content {
            patch.content = Some(self.content.clone());
        }
        if self.priority != raw.priority {
            patch.priority = Some(self.priority);
        }
        if self.due != raw.due {
            patch.due = Some(self.due.clone().unwrap_or_default());
        }
        (!patch.is_empty()).then_some(patch)
    }

    /// Creates the task, or sends the changed fields of an existing one.
    pub async fn save(&mut self, sink: &dyn TaskSink) -> ProviderResult<()> {
        let Some(id) = self.id.clone() else {
            let raw = sink
                .add_item(NewTask {
                    content: self.content.clone(),
                    project_id: self.project_id.clone(),
                    priority: self.priority,
                    due: self.due.clone(),
                })
                .await?;
            debug!(task_id = %raw.id, sink = sink.name(), "created task");
            self.update_from_raw(raw);
            return Ok(());
        };

        let Some(patch) = self.pending_changes() else {
            return Ok(());
        };
        sink.update_item(&id, patch).await?;
        debug!(task_id = %id, sink = sink.name(), "updated task");

        if let Some(ref mut raw) = self.raw {
            raw.content = self.content.clone();
            raw.priority = self.priority;
            raw.due = self.due.clone();
        }
        Ok(())
    }
}

impl fmt::Display for TaskItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: content: {}, priority: {}, due: {}, string: {}",
            self.id.as_deref().unwrap_or("-"),
            self.content,
            self.priority,
            self.due
                .as_ref()
                .and_then(|due| due.date.as_deref())
                .unwrap_or("-"),
            self.due_string().unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_task(due: Option<Due>) -> RawTask {
        RawTask {
            id: "task-1".to_string(),
            content: "Standup".to_string(),
            project_id: "proj".to_string(),
            priority: 1,
            due,
        }
    }

    fn due_on(date: &str) -> Due {
        Due {
            date: Some(date.to_string()),
            ..Due::default()
        }
    }

    #[test]
    fn next_due_date_formats() {
        let at = |date: &str| {
            TaskItem::from_raw(raw_task(Some(due_on(date))))
                .next_due_date()
                .unwrap()
                .unwrap()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        };
        assert_eq!(at("2024-01-04"), "2024-01-04 00:00:00");
        assert_eq!(at("2024-01-04T15:00:00"), "2024-01-04 15:00:00");
        assert_eq!(at("2024-01-04T15:00:00Z"), "2024-01-04 15:00:00");

        assert_eq!(TaskItem::from_raw(raw_task(None)).next_due_date().unwrap(), None);
    }

    #[test]
    fn next_due_date_rejects_garbage() {
        let item = TaskItem::from_raw(raw_task(Some(due_on("next tuesday"))));
        let err = item.next_due_date().unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::InvalidTask);
    }

    #[test]
    fn due_string_and_recurrence() {
        let mut item = TaskItem::from_raw(raw_task(Some(Due {
            string: Some("every day".to_string()),
            is_recurring: true,
            ..Due::default()
        })));
        assert!(item.is_recurring());
        assert_eq!(item.due_string(), Some("every day"));

        item.set_due_by_string("every week on Monday at 09:00");
        assert!(!item.is_recurring());
        assert_eq!(item.due_string(), Some("every week on Monday at 09:00"));
    }

    #[test]
    fn set_next_occurrence_keeps_string() {
        let mut item = TaskItem::from_raw(raw_task(Some(Due::from_string("every day"))));
        let at = NaiveDate::from_ymd_opt(2024, 1, 4)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();

        item.set_next_occurrence(at, true);
        assert_eq!(item.due().unwrap().date.as_deref(), Some("2024-01-04T15:00:00"));
        assert_eq!(item.due_string(), Some("every day"));

        item.set_next_occurrence(at, false);
        assert_eq!(item.due().unwrap().date.as_deref(), Some("2024-01-04"));
    }

    #[test]
    fn pending_changes_diff() {
        let mut item = TaskItem::from_raw(raw_task(None));
        assert!(item.pending_changes().is_none());

        item.priority = 4;
        item.set_due_by_string("every day");
        let patch = item.pending_changes().unwrap();
        assert_eq!(patch.content, None);
        assert_eq!(patch.priority, Some(4));
        assert_eq!(patch.due, Some(Due::from_string("every day")));

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "priority": 4,
                "due": {"string": "every day", "is_recurring": false}
            })
        );
    }

    #[test]
    fn unsaved_task_has_no_id() {
        let item = TaskItem::new("Review", "proj");
        assert_eq!(item.id(), None);
        assert_eq!(item.priority, DEFAULT_PRIORITY);
        assert!(item.pending_changes().is_none());
        assert_eq!(
            item.to_string(),
            "-: content: Review, priority: 1, due: -, string: -"
        );
    }

    #[test]
    fn raw_task_deserializes_with_defaults() {
        let raw: RawTask = serde_json::from_value(serde_json::json!({
            "id": "42",
            "content": "Plan",
            "project_id": "p"
        }))
        .unwrap();
        assert_eq!(raw.priority, DEFAULT_PRIORITY);
        assert_eq!(raw.due, None);
    }
}
