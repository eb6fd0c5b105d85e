//! Routing traits and types for turning a parsed command into a reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::command::ParsedCommand;
use crate::sessions::SessionState;

/// Outcome of a config backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Err,
}

/// What the dispatcher decided to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchResult {
    /// The message was not for us; nothing is posted.
    Ignored,
    Text { text: String },
    FileAttachment {
        status: FileStatus,
        path: Option<PathBuf>,
    },
}

impl DispatchResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn attachment_ok(path: PathBuf) -> Self {
        Self::FileAttachment {
            status: FileStatus::Ok,
            path: Some(path),
        }
    }

    pub fn attachment_failed() -> Self {
        Self::FileAttachment {
            status: FileStatus::Err,
            path: None,
        }
    }

    /// Reply text, if this is a plain text result.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Maps parsed commands onto backend calls.
#[async_trait]
pub trait Router: Send + Sync {
    /// Resolve one command. Never fails: backend and internal errors become
    /// reply text.
    async fn dispatch(&self, command: &ParsedCommand, session: &dyn SessionState) -> DispatchResult;

    fn name(&self) -> &str;
}
