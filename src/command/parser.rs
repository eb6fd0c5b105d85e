use super::targets::TargetAllowList;
use super::traits::{BackendKind, CommandParser, ErrorReason, ParsedCommand, Verb};

/// Whitespace-token parser for `<prefix> <method>` and `<prefix> <target> <verb>`.
pub struct DefaultCommandParser {
    prefix: String,
    targets: TargetAllowList,
}

impl DefaultCommandParser {
    pub fn new(prefix: &str, targets: TargetAllowList) -> Self {
        Self {
            prefix: prefix.trim().to_string(),
            targets,
        }
    }

    pub fn targets(&self) -> &TargetAllowList {
        &self.targets
    }

    /// `<prefix> <token>` where the token is not a backend keyword.
    fn classify_lone_argument(&self, token: &str, selected: Option<BackendKind>) -> ErrorReason {
        if selected.is_none() {
            ErrorReason::NoMethodSelected
        } else if self.targets.looks_like_target(token) {
            ErrorReason::NoCommandFound
        } else {
            ErrorReason::NoIpSpecified
        }
    }
}

impl CommandParser for DefaultCommandParser {
    fn parse(&self, raw: &str, selected: Option<BackendKind>) -> ParsedCommand {
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        if tokens.first().copied() != Some(self.prefix.as_str()) {
            return ParsedCommand::error(ErrorReason::MissingPrefix);
        }

        match tokens.as_slice() {
            [_] if selected.is_none() => {
                ParsedCommand::error(ErrorReason::NoMethodAndNoIpAndNoCommand)
            }
            [_] => ParsedCommand::error(ErrorReason::NoCommand),
            [_, arg] => match BackendKind::from_keyword(arg) {
                Some(backend) => ParsedCommand::SelectBackend { backend },
                None => ParsedCommand::error(self.classify_lone_argument(arg, selected)),
            },
            [_, target, verb, ..] => {
                if !self.targets.contains(target) {
                    return ParsedCommand::error(ErrorReason::InvalidTarget);
                }
                ParsedCommand::DeviceCommand {
                    target: (*target).to_string(),
                    verb: Verb::from_token(verb),
                }
            }
            [] => ParsedCommand::error(ErrorReason::MissingPrefix),
        }
    }

    fn address_prefix(&self) -> &str {
        &self.prefix
    }

    fn name(&self) -> &str {
        "default"
    }
}
