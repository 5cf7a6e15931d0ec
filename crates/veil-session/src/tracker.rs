//! Event tracking sink
//!
//! Analytics events are fire-and-forget: admission spawns the call and
//! never awaits or inspects the result. The backend behind the trait
//! is external; tests substitute the in-memory tracker.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

/// Tracker errors; always swallowed by callers
#[derive(Debug, Error)]
#[error("Tracker error: {0}")]
pub struct TrackerError(pub String);

/// Sink for analytics events
#[async_trait]
pub trait EventTracker: Send + Sync {
    async fn track_event(&self, category: &str, action: &str) -> Result<(), TrackerError>;
}

/// Tracker that drops every event
pub struct NoopTracker;

#[async_trait]
impl EventTracker for NoopTracker {
    async fn track_event(&self, _category: &str, _action: &str) -> Result<(), TrackerError> {
        Ok(())
    }
}

/// In-memory tracker for tests
#[derive(Default)]
pub struct MemoryTracker {
    events: Mutex<Vec<(String, String)>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTracker for MemoryTracker {
    async fn track_event(&self, category: &str, action: &str) -> Result<(), TrackerError> {
        self.events
            .lock()
            .unwrap()
            .push((category.to_string(), action.to_string()));
        Ok(())
    }
}
