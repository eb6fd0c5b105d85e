//! Command grammar: turns chat text addressed to the bot into structured commands.

pub mod parser;
pub mod targets;
pub mod traits;

pub use parser::DefaultCommandParser;
pub use targets::TargetAllowList;
pub use traits::{BackendKind, CommandParser, ErrorReason, ParsedCommand, Verb, VALID_VERBS};

use crate::config::DispatcherConfig;

/// Create the default parser from the `[dispatcher]` section.
pub fn create_parser(config: &DispatcherConfig) -> Box<dyn CommandParser> {
    Box::new(DefaultCommandParser::new(
        &config.address_prefix,
        TargetAllowList::new(config.allowed_targets.iter().cloned()),
    ))
}
