//! Command routing: resolves a parsed command to a backend call and a reply.

pub mod default;
pub mod responses;
pub mod traits;

pub use default::DefaultRouter;
pub use traits::{DispatchResult, FileStatus, Router};

use crate::backends::BackendSet;
use crate::command::TargetAllowList;
use crate::config::Config;

/// Create the default router over `backends`.
pub fn create_router(config: &Config, backends: BackendSet) -> Box<dyn Router> {
    Box::new(DefaultRouter::new(
        backends,
        TargetAllowList::new(config.dispatcher.allowed_targets.iter().cloned()),
        &config.dispatcher.address_prefix,
        &config.interface.label(),
        config.dispatcher.backend_timeout(),
    ))
}
