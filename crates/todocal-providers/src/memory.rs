//! In-memory calendar source and task sink.
//!
//! Both keep their records behind a `tokio` mutex and apply updates the way
//! the remote services would. They back the tests and dry runs.

use tokio::sync::Mutex;
use todocal_core::{EventPatch, RawEvent};
use tracing::trace;

use crate::error::{ProviderError, ProviderResult};
use crate::sink::TaskSink;
use crate::source::{BoxFuture, CalendarSource, EventPage};
use crate::task::{NewTask, RawTask, TaskPatch};

const PROVIDER_NAME: &str = "memory";
const DEFAULT_PAGE_SIZE: usize = 250;

/// A calendar source serving a fixed list of raw events.
#[derive(Debug)]
pub struct InMemoryCalendarSource {
    events: Mutex<Vec<RawEvent>>,
    updates: Mutex<Vec<(String, EventPatch)>>,
    page_size: usize,
}

impl InMemoryCalendarSource {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            updates: Mutex::new(Vec::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Builder method to set how many events each page holds.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replaces or appends a record, as if it changed remotely.
    pub async fn put(&self, raw: RawEvent) {
        let mut events = self.events.lock().await;
        match events.iter_mut().find(|event| event.id == raw.id) {
            Some(existing) => *existing = raw,
            None => events.push(raw),
        }
    }

    /// The stored record with the given id.
    pub async fn event(&self, id: &str) -> Option<RawEvent> {
        self.events
            .lock()
            .await
            .iter()
            .find(|event| event.id.as_deref() == Some(id))
            .cloned()
    }

    /// Every update received, in order.
    pub async fn updates(&self) -> Vec<(String, EventPatch)> {
        self.updates.lock().await.clone()
    }
}

impl CalendarSource for InMemoryCalendarSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_events(&self, page_token: Option<String>) -> BoxFuture<'_, ProviderResult<EventPage>> {
        Box::pin(async move {
            let offset = match page_token {
                Some(token) => token.parse::<usize>().map_err(|e| {
                    ProviderError::invalid_response(format!("bad page token '{token}'"))
                        .with_provider(PROVIDER_NAME)
                        .with_source(e)
                })?,
                None => 0,
            };

            let events = self.events.lock().await;
            let end = (offset + self.page_size).min(events.len());
            let page = EventPage::new(events.get(offset..end).unwrap_or_default().to_vec());
            trace!(offset, end, total = events.len(), "serving events page");

            Ok(if end < events.len() {
                page.with_next_page_token(end.to_string())
            } else {
                page
            })
        })
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut events = self.events.lock().await;
            let event = events
                .iter_mut()
                .find(|event| event.id.as_deref() == Some(event_id))
                .ok_or_else(|| {
                    ProviderError::not_found(format!("no event '{event_id}'"))
                        .with_provider(PROVIDER_NAME)
                })?;

            if let Some(ref summary) = patch.summary {
                event.summary = Some(summary.clone());
            }
            if let Some(ref properties) = patch.extended_properties {
                event.extended_properties = Some(properties.clone());
            }

            self.updates
                .lock()
                .await
                .push((event_id.to_string(), patch));
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
struct TaskStore {
    tasks: Vec<RawTask>,
    next_id: u64,
}

/// A task sink that keeps created tasks in memory.
#[derive(Debug, Default)]
pub struct InMemoryTaskSink {
    store: Mutex<TaskStore>,
}

impl InMemoryTaskSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tasks(&self) -> Vec<RawTask> {
        self.store.lock().await.tasks.clone()
    }

    pub async fn task(&self, id: &str) -> Option<RawTask> {
        self.store
            .lock()
            .await
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }
}

impl TaskSink for InMemoryTaskSink {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn add_item(&self, task: NewTask) -> BoxFuture<'_, ProviderResult<RawTask>> {
        Box::pin(async move {
            let mut store = self.store.lock().await;
            store.next_id += 1;
            let raw = RawTask {
                id: format!("task-{}", store.next_id),
                content: task.content,
                project_id: task.project_id,
                priority: task.priority,
                due: task.due,
            };
            store.tasks.push(raw.clone());
            Ok(raw)
        })
    }

    fn update_item<'a>(
        &'a self,
        task_id: &'a str,
        patch: TaskPatch,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut store = self.store.lock().await;
            let task = store
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| {
                    ProviderError::not_found(format!("no task '{task_id}'"))
                        .with_provider(PROVIDER_NAME)
                })?;

            if let Some(content) = patch.content {
                task.content = content;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(due) = patch.due {
                task.due = Some(due);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::task::TaskItem;
    use todocal_core::RawEventTime;

    fn raw(id: &str) -> RawEvent {
        RawEvent::new(id, RawEventTime::from_date_time("2024-01-01T09:00:00Z", None))
    }

    #[tokio::test]
    async fn pages_through_events() {
        let source =
            InMemoryCalendarSource::new(vec![raw("a"), raw("b"), raw("c")]).with_page_size(2);

        let first = source.list_events(None).await.unwrap();
        assert_eq!(first.events.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let second = source.list_events(first.next_page_token).await.unwrap();
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.next_page_token, None);
    }

    #[tokio::test]
    async fn bad_page_token() {
        let source = InMemoryCalendarSource::new(vec![raw("a")]);
        let err = source
            .list_events(Some("later".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn update_event_applies_patch() {
        let source = InMemoryCalendarSource::new(vec![raw("a")]);
        let patch = EventPatch {
            summary: Some("Renamed".to_string()),
            ..Default::default()
        };
        source.update_event("a", patch.clone()).await.unwrap();

        assert_eq!(source.event("a").await.unwrap().summary.as_deref(), Some("Renamed"));
        assert_eq!(source.updates().await, vec![("a".to_string(), patch)]);

        let err = source
            .update_event("zzz", EventPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn task_save_creates_then_updates() {
        let sink = InMemoryTaskSink::new();
        let mut item = TaskItem::new("Standup", "proj");
        item.set_due_by_string("every day at 09:00");

        item.save(&sink).await.unwrap();
        assert_eq!(item.id(), Some("task-1"));
        assert!(item.pending_changes().is_none());

        item.content = "Standup (moved)".to_string();
        item.save(&sink).await.unwrap();
        assert!(item.pending_changes().is_none());

        let stored = sink.task("task-1").await.unwrap();
        assert_eq!(stored.content, "Standup (moved)");
        assert_eq!(
            stored.due.and_then(|due| due.string).as_deref(),
            Some("every day at 09:00")
        );
        assert_eq!(sink.tasks().await.len(), 1);
    }
}
