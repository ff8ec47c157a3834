//! Local cache of a calendar's events.
//!
//! [`Calendar::sync`] pulls every page from a [`CalendarSource`] and files
//! the records into [`Event`]s: single events and recurring masters at the
//! top level, exception instances under their master.

use std::collections::HashMap;

use chrono_tz::Tz;
use todocal_core::{CalendarSettings, Event, RawEvent};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::source::CalendarSource;

/// Counts from one [`Calendar::sync`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pages: usize,
    pub events: usize,
    pub exceptions: usize,
    /// Exceptions whose master never showed up in the listing.
    pub orphans: usize,
}

/// The events of one calendar, keyed by id.
#[derive(Debug)]
pub struct Calendar {
    settings: CalendarSettings,
    default_tz: Tz,
    events: HashMap<String, Event>,
}

impl Calendar {
    /// Creates an empty cache for the configured calendar.
    ///
    /// # Errors
    ///
    /// Fails when the configured default timezone is unknown.
    pub fn new(settings: CalendarSettings) -> ProviderResult<Self> {
        let default_tz = settings.timezone()?;
        Ok(Self {
            settings,
            default_tz,
            events: HashMap::new(),
        })
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_tz
    }

    /// Top-level events: single events and recurring masters.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    /// Looks up a top-level event or an exception instance by id.
    pub fn event_mut(&mut self, id: &str) -> Option<&mut Event> {
        if self.events.contains_key(id) {
            return self.events.get_mut(id);
        }
        self.events
            .values_mut()
            .find_map(|master| master.exception_mut(id))
    }

    /// Pulls all pages from `source` and refreshes the cache.
    ///
    /// Exceptions listed before their master are held back until the end of
    /// the pull. Exceptions whose master is still unknown then are dropped.
    pub async fn sync(&mut self, source: &dyn CalendarSource) -> ProviderResult<SyncStats> {
        let mut stats = SyncStats::default();
        let mut pending = Vec::new();
        let mut page_token = None;

        loop {
            let page = source.list_events(page_token.take()).await?;
            stats.pages += 1;
            debug!(
                source = source.name(),
                page = stats.pages,
                events = page.events.len(),
                "received events page"
            );

            for raw in page.events {
                if raw.is_exception() {
                    if !self.file_exception(&raw)? {
                        pending.push(raw);
                        continue;
                    }
                    stats.exceptions += 1;
                } else {
                    self.upsert(&raw)?;
                    stats.events += 1;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        for raw in pending {
            if self.file_exception(&raw)? {
                stats.exceptions += 1;
            } else {
                warn!(
                    exception_id = raw.id.as_deref().unwrap_or_default(),
                    master_id = raw.recurring_event_id.as_deref().unwrap_or_default(),
                    "dropping exception of unknown series"
                );
                stats.orphans += 1;
            }
        }

        info!(
            source = source.name(),
            events = stats.events,
            exceptions = stats.exceptions,
            orphans = stats.orphans,
            "calendar synced"
        );
        Ok(stats)
    }

    /// Pushes the local edits of one event back to the source.
    ///
    /// Returns `false` when there was nothing to save.
    pub async fn save_event(
        &mut self,
        source: &dyn CalendarSource,
        id: &str,
    ) -> ProviderResult<bool> {
        let event = self
            .event_mut(id)
            .ok_or_else(|| ProviderError::not_found(format!("no cached event '{id}'")))?;
        let Some(patch) = event.pending_changes() else {
            return Ok(false);
        };

        source.update_event(id, patch).await?;
        event.mark_saved();
        debug!(event_id = id, source = source.name(), "saved event");
        Ok(true)
    }

    fn upsert(&mut self, raw: &RawEvent) -> ProviderResult<()> {
        let id = raw.id.as_deref().unwrap_or_default();
        match self.events.get_mut(id) {
            Some(event) => event.update_from_raw(raw)?,
            None => {
                let event = Event::from_raw(raw, self.default_tz)?;
                self.events.insert(event.id().to_string(), event);
            }
        }
        Ok(())
    }

    /// Files an exception under its master. Returns `false` if the master is
    /// not cached.
    fn file_exception(&mut self, raw: &RawEvent) -> ProviderResult<bool> {
        let master_id = raw.recurring_event_id.as_deref().unwrap_or_default();
        match self.events.get_mut(master_id) {
            Some(master) => {
                master.update_exception(raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
