use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::command::BackendKind;

/// Failure talking to a device or to the orchestration tool.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("device rejected the request: {0}")]
    Rejected(String),
    #[error("{program} exited with {code:?}: {stderr}")]
    Process {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Operational state of the managed loopback interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceState {
    Enabled,
    Disabled,
    /// The interface does not exist on the device.
    Absent,
}

impl InterfaceState {
    /// Admin status decides; a link that is admin-up but oper-down still
    /// counts as enabled.
    pub fn from_statuses(admin: &str, _oper: &str) -> Self {
        if admin.trim().eq_ignore_ascii_case("up") {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// A protocol that can manage the loopback interface. RESTCONF and NETCONF
/// are interchangeable implementations selected by the session.
#[async_trait]
pub trait StructuredConfigBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    async fn create(&self, target: &str) -> BackendResult<()>;
    async fn delete(&self, target: &str) -> BackendResult<()>;
    async fn enable(&self, target: &str) -> BackendResult<()>;
    async fn disable(&self, target: &str) -> BackendResult<()>;
    async fn status(&self, target: &str) -> BackendResult<InterfaceState>;
}

/// Interactive CLI access used for interface summaries.
#[async_trait]
pub trait CommandSessionBackend: Send + Sync {
    fn name(&self) -> &str;
    /// One-line GigabitEthernet summary, ready to post.
    async fn interface_summary(&self, target: &str) -> BackendResult<String>;
}

/// Automation job that pulls a device's running configuration to a file.
#[async_trait]
pub trait OrchestrationBackend: Send + Sync {
    fn name(&self) -> &str;
    /// Path of the backup file written for `target`.
    async fn backup_config(&self, target: &str) -> BackendResult<PathBuf>;
}
