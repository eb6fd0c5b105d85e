//! In-memory session implementation.

use chrono::Utc;
use parking_lot::Mutex;

use super::traits::{SessionSnapshot, SessionState};
use crate::command::BackendKind;

/// Process-lifetime session backed by a mutex-protected record.
pub struct InMemorySession {
    state: Mutex<SessionSnapshot>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionSnapshot::default()),
        }
    }

    /// Start with a backend already selected.
    pub fn with_backend(kind: BackendKind) -> Self {
        let session = Self::new();
        session.select(kind);
        session
    }
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState for InMemorySession {
    fn select(&self, kind: BackendKind) {
        let mut state = self.state.lock();
        let previous = state.backend.replace(kind);
        state.selected_at = Some(Utc::now());
        state.selections = state.selections.saturating_add(1);
        drop(state);

        if previous != Some(kind) {
            tracing::info!(
                backend = kind.keyword(),
                previous = previous.map(BackendKind::keyword),
                "Backend selected"
            );
        }
    }

    fn current(&self) -> Option<BackendKind> {
        self.state.lock().backend
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().clone()
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
