//! Error types for calendar source and task sink operations.

use std::fmt;

use thiserror::Error;
use todocal_core::EventError;

/// What went wrong, independent of which collaborator reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The remote service could not be reached or asked us to back off.
    Unavailable,
    /// The remote service refused the request (credentials, permissions).
    Rejected,
    /// A page, token or payload from the remote could not be understood.
    InvalidResponse,
    /// No event or task with the requested id.
    NotFound,
    /// A calendar record violates the event model.
    InvalidEvent,
    /// A task record or due value is malformed.
    InvalidTask,
}

impl ProviderErrorCode {
    /// Only an unreachable remote is worth another attempt.
    pub fn is_retryable(self) -> bool {
        self == Self::Unavailable
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid response",
            Self::NotFound => "not found",
            Self::InvalidEvent => "invalid event",
            Self::InvalidTask => "invalid task",
        };
        f.write_str(name)
    }
}

/// An error raised by a calendar source, a task sink, or the glue between
/// them and the event model.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Which collaborator failed (e.g. "google", "todoist", "memory").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidTask, message)
    }

    /// Names the collaborator that failed.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl From<EventError> for ProviderError {
    fn from(err: EventError) -> Self {
        Self::new(ProviderErrorCode::InvalidEvent, err.to_string()).with_source(err)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(ref provider) => write!(f, "{provider}: {} ({})", self.message, self.code),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(ProviderErrorCode::Unavailable.is_retryable());
        assert!(!ProviderErrorCode::Rejected.is_retryable());
        assert!(!ProviderErrorCode::InvalidEvent.is_retryable());
        assert!(!ProviderError::not_found("gone").is_retryable());
    }

    #[test]
    fn display_names_the_provider() {
        let err = ProviderError::not_found("no event 'abc'").with_provider("memory");
        assert_eq!(err.to_string(), "memory: no event 'abc' (not found)");
        assert_eq!(err.provider(), Some("memory"));

        let err = ProviderError::invalid_task("bad due date");
        assert_eq!(err.to_string(), "bad due date (invalid task)");
    }

    #[test]
    fn from_event_error_keeps_source() {
        let err: ProviderError = EventError::missing_field("evt-1", "start").into();
        assert_eq!(err.code(), ProviderErrorCode::InvalidEvent);
        assert!(err.message().contains("evt-1"));
        assert!(err.source().is_some());
    }
}
