pub mod poll_loop;

pub use poll_loop::{IterationOutcome, LoopStats, PollLoop};

use std::sync::Arc;

use crate::backends::create_backends;
use crate::channels::WebexTransport;
use crate::command::create_parser;
use crate::config::Config;
use crate::routing::create_router;
use crate::sessions::create_session;

/// Wire the Webex transport, parser, router and a fresh session into a loop.
pub fn create_poll_loop(config: &Config) -> PollLoop {
    let backends = create_backends(config);
    PollLoop::new(
        Arc::new(WebexTransport::from_config(&config.webex)),
        create_parser(&config.dispatcher),
        create_router(config, backends),
        create_session(),
        config.dispatcher.poll_interval(),
    )
    .with_dedupe(config.dispatcher.dedupe_messages)
}

/// Resolves on Ctrl-C. If the handler cannot be installed the future never
/// resolves and the process has to be killed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
