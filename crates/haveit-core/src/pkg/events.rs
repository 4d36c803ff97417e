//! Lifecycle events emitted while a batch runs.
//!
//! The engine never prints; callers plug in an [`Observer`] to turn these
//! into console lines, log records, or assertions.

use super::manifest::CandidateInvalid;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;

/// Something that happened during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResolveEvent {
    /// A folder produced a valid candidate.
    CandidateFound {
        name: String,
        version: String,
        folder: PathBuf,
    },
    /// A scanned folder was not a usable installation.
    CandidateSkipped {
        folder: PathBuf,
        reason: CandidateInvalid,
    },
    /// Requests that no local candidate satisfies.
    NamesMissing { names: Vec<String> },
    /// A placeholder package was written for a candidate.
    PackageLinked {
        name: String,
        version: String,
        main: PathBuf,
    },
    /// Writing a placeholder package failed.
    LinkFailed { name: String, message: String },
    /// Missing requests were handed to the remote installer.
    FallbackDispatched { command: String },
    /// Linked packages were recorded in the project manifest.
    DependenciesRecorded { names: Vec<String>, dev: bool },
}

/// Receives [`ResolveEvent`]s.
///
/// Events arrive from concurrently running tasks, in completion order.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ResolveEvent);
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _event: &ResolveEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ResolveEvent>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<ResolveEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &ResolveEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
