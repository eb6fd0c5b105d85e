//! Default router: one backend call per device command, every failure
//! rendered as reply text.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::responses;
use super::traits::{DispatchResult, Router};
use crate::backends::{BackendError, BackendResult, BackendSet};
use crate::command::{BackendKind, ParsedCommand, TargetAllowList, Verb};
use crate::sessions::SessionState;

pub struct DefaultRouter {
    backends: BackendSet,
    targets: TargetAllowList,
    prefix: String,
    interface_label: String,
    backend_timeout: Duration,
}

impl DefaultRouter {
    pub fn new(
        backends: BackendSet,
        targets: TargetAllowList,
        prefix: &str,
        interface_label: &str,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            backends,
            targets,
            prefix: prefix.trim().to_string(),
            interface_label: interface_label.to_string(),
            backend_timeout,
        }
    }

    /// Bound a backend call by the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> BackendResult<T>
    where
        F: Future<Output = BackendResult<T>> + Send,
    {
        match tokio::time::timeout(self.backend_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.backend_timeout)),
        }
    }

    async fn run_structured(&self, kind: BackendKind, target: &str, verb: &Verb) -> String {
        let backend = self.backends.structured(kind);
        let label = self.interface_label.as_str();

        if *verb == Verb::Status {
            return match self.bounded(backend.status(target)).await {
                Ok(state) => responses::status_report(state, label, kind),
                Err(e) => {
                    tracing::warn!(target, backend = %kind, error = %e, "Status check failed");
                    responses::status_report(crate::backends::InterfaceState::Absent, label, kind)
                }
            };
        }

        let outcome = match verb {
            Verb::Create => self.bounded(backend.create(target)).await,
            Verb::Delete => self.bounded(backend.delete(target)).await,
            Verb::Enable => self.bounded(backend.enable(target)).await,
            Verb::Disable => self.bounded(backend.disable(target)).await,
            _ => return responses::FAILED_TO_PROCESS.to_string(),
        };

        let reply = match outcome {
            Ok(()) => {
                tracing::info!(target, backend = %kind, verb = verb.token(), "Interface change applied");
                responses::config_success(verb, label, kind)
            }
            Err(e) => {
                tracing::warn!(target, backend = %kind, verb = verb.token(), error = %e, "Interface change failed");
                responses::config_failure(verb, label, kind)
            }
        };
        reply.unwrap_or_else(|| responses::FAILED_TO_PROCESS.to_string())
    }

    async fn run_summary(&self, target: &str) -> String {
        let backend = self.backends.command_session();
        match self.bounded(backend.interface_summary(target)).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(target, backend = backend.name(), error = %e, "Interface summary failed");
                responses::FAILED_TO_PROCESS.to_string()
            }
        }
    }

    async fn run_backup(&self, target: &str) -> DispatchResult {
        let backend = self.backends.orchestration();
        match self.bounded(backend.backup_config(target)).await {
            Ok(path) => {
                tracing::info!(target, path = %path.display(), "Config backup written");
                DispatchResult::attachment_ok(path)
            }
            Err(e) => {
                tracing::warn!(target, backend = backend.name(), error = %e, "Config backup failed");
                DispatchResult::attachment_failed()
            }
        }
    }

    async fn dispatch_device(
        &self,
        target: &str,
        verb: &Verb,
        session: &dyn SessionState,
    ) -> DispatchResult {
        if !self.targets.contains(target) {
            tracing::debug!(target, "Rejected target outside the allow-list");
            return DispatchResult::text(responses::invalid_target(&self.targets.describe()));
        }

        match verb {
            Verb::Unknown(token) => {
                tracing::debug!(target, token = %token, "Unknown verb");
                DispatchResult::text(responses::UNKNOWN_COMMAND)
            }
            Verb::InterfaceSummary => DispatchResult::text(self.run_summary(target).await),
            Verb::ConfigBackup => self.run_backup(target).await,
            _ => match session.current() {
                None => DispatchResult::text(responses::NO_METHOD),
                Some(kind) => DispatchResult::text(self.run_structured(kind, target, verb).await),
            },
        }
    }
}

#[async_trait]
impl Router for DefaultRouter {
    async fn dispatch(&self, command: &ParsedCommand, session: &dyn SessionState) -> DispatchResult {
        match command {
            ParsedCommand::ParseError { reason } => {
                match responses::parse_error(*reason, &self.prefix, &self.targets.describe()) {
                    Some(text) => DispatchResult::text(text),
                    None => DispatchResult::Ignored,
                }
            }
            ParsedCommand::SelectBackend { backend } => {
                session.select(*backend);
                DispatchResult::text(responses::backend_selected(*backend))
            }
            ParsedCommand::DeviceCommand { target, verb } => {
                self.dispatch_device(target, verb, session).await
            }
        }
    }

    fn name(&self) -> &str {
        "default"
    }
}
