//! Dispatch event records
//!
//! An [`Event`] is constructed fresh for every dispatch pass and handed to
//! each listener by reference, ahead of the extra arguments supplied to
//! `emit`. The registry never stores events.

use std::fmt;
use std::sync::Arc;

use crate::instance::Instance;

/// An immutable record describing one dispatch pass
pub struct Event {
    kind: Arc<str>,
    target: Instance,
    timestamp_ms: i64,
}

impl Event {
    pub(crate) fn new(kind: &str, target: Instance) -> Self {
        Self {
            kind: Arc::from(kind),
            target,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Name of the event being dispatched
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The instance the event was emitted on
    pub fn target(&self) -> &Instance {
        &self.target
    }

    /// Wall-clock milliseconds at which the dispatch pass began
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("timestamp_ms", &self.timestamp_ms)
            .finish_non_exhaustive()
    }
}
