use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most recent message in the room, as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Option<String>,
    pub text: String,
    pub sender: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            sender: None,
            created: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A chat room the dispatcher polls and answers in.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Latest message in the room, if any.
    async fn fetch_latest(&self) -> TransportResult<Option<InboundMessage>>;

    async fn post_text(&self, text: &str) -> TransportResult<()>;

    /// Post `bytes` as an attachment named `filename`, with `text` alongside.
    async fn post_file(&self, text: &str, filename: &str, bytes: Vec<u8>) -> TransportResult<()>;

    /// Verify credentials and reachability without posting anything.
    async fn health_check(&self) -> TransportResult<String>;
}
