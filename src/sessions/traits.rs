//! Session state traits and types for backend selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::BackendKind;

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub backend: Option<BackendKind>,
    /// When the current backend was last selected.
    pub selected_at: Option<DateTime<Utc>>,
    /// Number of selections since startup, including repeats.
    pub selections: u64,
}

/// Holds which structured-config backend is active.
///
/// The selection applies to every target; it is not scoped per device.
pub trait SessionState: Send + Sync {
    /// Overwrite the selection. Selecting the current backend again is a no-op
    /// apart from bookkeeping.
    fn select(&self, kind: BackendKind);

    /// The active backend, if any has been selected.
    fn current(&self) -> Option<BackendKind>;

    fn snapshot(&self) -> SessionSnapshot;

    /// The name of this session implementation.
    fn name(&self) -> &str;
}
