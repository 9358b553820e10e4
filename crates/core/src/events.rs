use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::CleanerError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Info,
    Error,
    Deleted,
    Moved,
    Cleanup,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
            Self::Deleted => "DELETED",
            Self::Moved => "MOVED",
            Self::Cleanup => "CLEANUP",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupEvent {
    pub kind: EventKind,
    pub message: String,
    pub error_kind: Option<String>,
}

impl CleanupEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error_kind: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventKind::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, message)
    }

    pub fn from_error(err: &CleanerError) -> Self {
        Self {
            kind: EventKind::Error,
            message: err.to_string(),
            error_kind: Some(err.kind().to_string()),
        }
    }
}

pub trait EventSink {
    fn record(&self, event: CleanupEvent);

    fn info(&self, message: &str) {
        self.record(CleanupEvent::info(message));
    }

    fn error(&self, message: &str) {
        self.record(CleanupEvent::error(message));
    }

    fn report(&self, err: &CleanerError) {
        self.record(CleanupEvent::from_error(err));
    }
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn record(&self, event: CleanupEvent) {
        (**self).record(event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: CleanupEvent) {
        let kind = event.kind.as_str();
        match event.kind {
            EventKind::Error => match event.error_kind.as_deref() {
                Some(error_kind) => tracing::error!(kind, error_kind, "{}", event.message),
                None => tracing::error!(kind, "{}", event.message),
            },
            _ => tracing::info!(kind, "{}", event.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CleanupEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CleanupEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<CleanupEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).len()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: CleanupEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
