use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::routing::responses::{ANSIBLE_FAILED, BACKUP_COMPANION_TEXT};
use crate::routing::{DispatchResult, FileStatus};

/// A post ready for the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPost {
    Text {
        body: String,
    },
    Attachment {
        companion_text: String,
        filename: String,
        path: PathBuf,
    },
}

impl OutboundPost {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }
}

/// Turn a dispatch result into at most one post. Branches on the result's
/// shape only; the verb that produced it is irrelevant here.
pub fn format_result(result: &DispatchResult) -> Option<OutboundPost> {
    match result {
        DispatchResult::Ignored => None,
        DispatchResult::Text { text } => Some(OutboundPost::text(text.clone())),
        DispatchResult::FileAttachment {
            status: FileStatus::Ok,
            path: Some(path),
        } if path.is_file() => {
            let Some(filename) = path.file_name() else {
                return Some(OutboundPost::text(ANSIBLE_FAILED));
            };
            Some(OutboundPost::Attachment {
                companion_text: BACKUP_COMPANION_TEXT.to_string(),
                filename: filename.to_string_lossy().to_string(),
                path: path.clone(),
            })
        }
        DispatchResult::FileAttachment { .. } => Some(OutboundPost::text(ANSIBLE_FAILED)),
    }
}
