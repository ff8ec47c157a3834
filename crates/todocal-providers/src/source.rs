//! The calendar source collaborator.
//!
//! A [`CalendarSource`] enumerates raw event records page by page and
//! accepts field-level updates keyed by event id. Masters, single events and
//! exception instances all come through the same listing; telling them apart
//! is left to [`Calendar`](crate::Calendar).

use std::future::Future;
use std::pin::Pin;

use todocal_core::{EventPatch, RawEvent};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the collaborator traits object-safe, so drivers can
/// hold `&dyn CalendarSource` and `&dyn TaskSink`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One page of raw event records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    /// Token for the following page; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl EventPage {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            events,
            next_page_token: None,
        }
    }

    /// Builder method to set the next page token.
    pub fn with_next_page_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }
}

/// Where calendar events come from and where their edits go back to.
pub trait CalendarSource: Send + Sync {
    /// Returns the name of this source (e.g. "google", "memory").
    fn name(&self) -> &str;

    /// Fetches one page of events. `None` requests the first page.
    ///
    /// Recurring series are not expanded: masters carry their `recurrence`
    /// and overrides come as separate records with `recurringEventId`.
    fn list_events(&self, page_token: Option<String>) -> BoxFuture<'_, ProviderResult<EventPage>>;

    /// Applies a partial update to one event.
    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
