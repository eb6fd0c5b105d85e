//! Chat transport: where commands come from and replies go.

pub mod traits;
pub mod webex;

pub use traits::{ChatTransport, InboundMessage, TransportError, TransportResult};
pub use webex::WebexTransport;

use crate::config::WebexConfig;

/// Create the Webex transport from the `[webex]` section.
pub fn create_transport(config: &WebexConfig) -> Box<dyn ChatTransport> {
    Box::new(WebexTransport::from_config(config))
}
