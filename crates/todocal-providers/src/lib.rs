//! Collaborator boundaries for syncing a calendar into a task manager.
//!
//! This crate sits between the event model of `todocal-core` and the outside
//! world:
//!
//! - [`CalendarSource`] - paginated raw events in, field-level updates out
//! - [`TaskSink`] - task creation and partial updates
//! - [`Calendar`] - local cache that files exceptions under their series
//! - [`TaskItem`] - a task with its due settings and dirty tracking
//! - [`ProviderError`] - error type for all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐               ┌──────────────────┐
//! │  CalendarSource  │               │     TaskSink     │
//! └────────┬─────────┘               └────────▲─────────┘
//!          │ EventPage                        │ NewTask / TaskPatch
//!          ▼                                  │
//! ┌──────────────────┐  next_occurrence ┌─────┴────────────┐
//! │     Calendar     ├─────────────────►│     TaskItem     │
//! │  (Event cache)   │ recurrence_string│                  │
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use todocal_providers::{Calendar, TaskItem};
//!
//! let mut calendar = Calendar::new(config.calendar.clone())?;
//! calendar.sync(&source).await?;
//! for event in calendar.events() {
//!     if let Some(next) = event.next_occurrence(chrono::Utc::now())? {
//!         let mut task = TaskItem::new(event.summary().unwrap_or_default(), &project);
//!         task.set_next_occurrence(next.start.date().and_time(chrono::NaiveTime::MIN), false);
//!         task.save(&sink).await?;
//!     }
//! }
//! ```

pub mod calendar;
pub mod error;
pub mod memory;
pub mod sink;
pub mod source;
pub mod task;

pub use calendar::{Calendar, SyncStats};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::{InMemoryCalendarSource, InMemoryTaskSink};
pub use sink::TaskSink;
pub use source::{BoxFuture, CalendarSource, EventPage};
pub use task::{DEFAULT_PRIORITY, Due, NewTask, RawTask, TaskItem, TaskPatch};
