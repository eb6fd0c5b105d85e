pub mod ansible;
pub mod cli_session;
pub mod netconf;
pub mod process;
pub mod restconf;
pub mod ssh;
pub mod traits;

pub use ansible::AnsibleBackup;
pub use cli_session::SshCommandSession;
pub use netconf::NetconfBackend;
pub use restconf::RestconfBackend;
pub use ssh::SshLauncher;
pub use traits::{
    BackendError, BackendResult, CommandSessionBackend, InterfaceState, OrchestrationBackend,
    StructuredConfigBackend,
};

use crate::command::BackendKind;
use crate::config::Config;
use std::sync::Arc;

/// Every device-facing capability the router can call.
#[derive(Clone)]
pub struct BackendSet {
    restconf: Arc<dyn StructuredConfigBackend>,
    netconf: Arc<dyn StructuredConfigBackend>,
    command_session: Arc<dyn CommandSessionBackend>,
    orchestration: Arc<dyn OrchestrationBackend>,
}

impl BackendSet {
    pub fn new(
        restconf: Arc<dyn StructuredConfigBackend>,
        netconf: Arc<dyn StructuredConfigBackend>,
        command_session: Arc<dyn CommandSessionBackend>,
        orchestration: Arc<dyn OrchestrationBackend>,
    ) -> Self {
        Self {
            restconf,
            netconf,
            command_session,
            orchestration,
        }
    }

    pub fn structured(&self, kind: BackendKind) -> &dyn StructuredConfigBackend {
        match kind {
            BackendKind::Restconf => self.restconf.as_ref(),
            BackendKind::Netconf => self.netconf.as_ref(),
        }
    }

    pub fn command_session(&self) -> &dyn CommandSessionBackend {
        self.command_session.as_ref()
    }

    pub fn orchestration(&self) -> &dyn OrchestrationBackend {
        self.orchestration.as_ref()
    }
}

/// Build the concrete backends described by `config`.
pub fn create_backends(config: &Config) -> BackendSet {
    let launcher = SshLauncher::new(&config.ssh, &config.device);
    BackendSet::new(
        Arc::new(RestconfBackend::new(
            &config.restconf,
            &config.device,
            config.interface.clone(),
            config.dispatcher.backend_timeout(),
        )),
        Arc::new(NetconfBackend::new(
            launcher.clone(),
            config.netconf.port,
            config.interface.clone(),
        )),
        Arc::new(SshCommandSession::new(launcher, config.ssh.port)),
        Arc::new(AnsibleBackup::new(&config.ansible, &config.device)),
    )
}
