//! The task sink collaborator.

use crate::error::ProviderResult;
use crate::source::BoxFuture;
use crate::task::{NewTask, RawTask, TaskPatch};

/// Where tasks mirrored from calendar events are written.
///
/// # Example Implementation
///
/// ```ignore
/// impl TaskSink for TodoistSink {
///     fn name(&self) -> &str { "todoist" }
///
///     fn add_item(&self, task: NewTask) -> BoxFuture<'_, ProviderResult<RawTask>> {
///         Box::pin(async move { self.client.add(task).await })
///     }
///     // ...
/// }
/// ```
pub trait TaskSink: Send + Sync {
    /// Returns the name of this sink (e.g. "todoist", "memory").
    fn name(&self) -> &str;

    /// Creates a task and returns the stored record, id included.
    fn add_item(&self, task: NewTask) -> BoxFuture<'_, ProviderResult<RawTask>>;

    /// Applies a partial update to an existing task.
    fn update_item<'a>(
        &'a self,
        task_id: &'a str,
        patch: TaskPatch,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
