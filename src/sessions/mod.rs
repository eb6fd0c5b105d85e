//! Session management: tracks which structured-config backend is active.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemorySession;
pub use traits::{SessionSnapshot, SessionState};

/// Create a default in-memory session with nothing selected.
pub fn create_session() -> Box<dyn SessionState> {
    Box::new(InMemorySession::new())
}
