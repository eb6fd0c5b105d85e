//! Reply texts posted back to the room.

use crate::backends::InterfaceState;
use crate::command::{BackendKind, ErrorReason, Verb, VALID_VERBS};

pub const NO_METHOD: &str = "Error: No method specified";
pub const NO_IP: &str = "Error: No IP specified";
pub const NO_COMMAND_FOUND: &str = "Error: No command found.";
pub const UNKNOWN_COMMAND: &str = "Error: Unknown command. Valid commands: create, delete, enable, disable, status, gigabit_status, showrun";
pub const FAILED_TO_PROCESS: &str = "Error: Failed to process command";
pub const ANSIBLE_FAILED: &str = "Error: Ansible";
pub const BACKUP_COMPANION_TEXT: &str = "show running config";

pub fn no_command(prefix: &str) -> String {
    format!(
        "Error: No command specified. Please use format: {prefix} <method> or {prefix} <IP> <command>"
    )
}

pub fn invalid_target(range: &str) -> String {
    format!("Error: Invalid IP. Valid IPs are {range}")
}

pub fn backend_selected(kind: BackendKind) -> String {
    format!("Ok: {}", kind.label())
}

/// Text for a parse error. `None` for errors that are never answered.
pub fn parse_error(reason: ErrorReason, prefix: &str, range: &str) -> Option<String> {
    match reason {
        ErrorReason::MissingPrefix => None,
        ErrorReason::NoCommand | ErrorReason::NoMethodAndNoIpAndNoCommand => {
            Some(no_command(prefix))
        }
        ErrorReason::NoMethodSelected => Some(NO_METHOD.to_string()),
        ErrorReason::NoIpSpecified => Some(NO_IP.to_string()),
        ErrorReason::NoCommandFound => Some(NO_COMMAND_FOUND.to_string()),
        ErrorReason::InvalidTarget => Some(invalid_target(range)),
    }
}

/// Past-tense word used in success replies. Disable keeps its historical wording.
fn success_word(verb: &Verb) -> Option<&'static str> {
    match verb {
        Verb::Create => Some("created"),
        Verb::Delete => Some("deleted"),
        Verb::Enable => Some("enabled"),
        Verb::Disable => Some("shutdowned"),
        _ => None,
    }
}

fn failure_word(verb: &Verb) -> Option<&'static str> {
    match verb {
        Verb::Create => Some("create"),
        Verb::Delete => Some("delete"),
        Verb::Enable => Some("enable"),
        Verb::Disable => Some("shutdown"),
        _ => None,
    }
}

pub fn config_success(verb: &Verb, interface: &str, kind: BackendKind) -> Option<String> {
    success_word(verb).map(|word| {
        format!(
            "Interface {interface} is {word} successfully using {}",
            kind.label()
        )
    })
}

pub fn config_failure(verb: &Verb, interface: &str, kind: BackendKind) -> Option<String> {
    if *verb == Verb::Status {
        return Some(status_report(InterfaceState::Absent, interface, kind));
    }
    failure_word(verb).map(|word| {
        format!(
            "Cannot {word}: Interface {interface} (checked by {})",
            kind.label()
        )
    })
}

pub fn status_report(state: InterfaceState, interface: &str, kind: BackendKind) -> String {
    let checked_by = kind.label();
    match state {
        InterfaceState::Enabled => {
            format!("Interface {interface} is enabled (checked by {checked_by})")
        }
        InterfaceState::Disabled => {
            format!("Interface {interface} is disabled (checked by {checked_by})")
        }
        InterfaceState::Absent => format!("No Interface {interface} (checked by {checked_by})"),
    }
}

/// The verb list as operators see it, derived from the grammar.
pub fn valid_commands() -> String {
    VALID_VERBS.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const IF: &str = "loopback 66070077";

    #[test]
    fn unknown_command_lists_every_verb() {
        assert_eq!(
            UNKNOWN_COMMAND,
            format!("Error: Unknown command. Valid commands: {}", valid_commands())
        );
    }

    #[test]
    fn no_command_mentions_prefix_twice() {
        assert_eq!(
            no_command("/66070077"),
            "Error: No command specified. Please use format: /66070077 <method> or /66070077 <IP> <command>"
        );
    }

    #[test]
    fn parse_error_texts() {
        let range = "10.0.15.61 to 10.0.15.65";
        assert_eq!(parse_error(ErrorReason::MissingPrefix, "/x", range), None);
        assert_eq!(
            parse_error(ErrorReason::NoMethodAndNoIpAndNoCommand, "/x", range),
            parse_error(ErrorReason::NoCommand, "/x", range)
        );
        assert_eq!(
            parse_error(ErrorReason::NoMethodSelected, "/x", range).unwrap(),
            "Error: No method specified"
        );
        assert_eq!(
            parse_error(ErrorReason::NoIpSpecified, "/x", range).unwrap(),
            "Error: No IP specified"
        );
        assert_eq!(
            parse_error(ErrorReason::NoCommandFound, "/x", range).unwrap(),
            "Error: No command found."
        );
        assert_eq!(
            parse_error(ErrorReason::InvalidTarget, "/x", range).unwrap(),
            "Error: Invalid IP. Valid IPs are 10.0.15.61 to 10.0.15.65"
        );
    }

    #[test]
    fn success_and_failure_wording() {
        assert_eq!(
            config_success(&Verb::Create, IF, BackendKind::Restconf).unwrap(),
            "Interface loopback 66070077 is created successfully using Restconf"
        );
        assert_eq!(
            config_success(&Verb::Disable, IF, BackendKind::Netconf).unwrap(),
            "Interface loopback 66070077 is shutdowned successfully using Netconf"
        );
        assert_eq!(
            config_failure(&Verb::Disable, IF, BackendKind::Restconf).unwrap(),
            "Cannot shutdown: Interface loopback 66070077 (checked by Restconf)"
        );
        assert_eq!(
            config_failure(&Verb::Delete, IF, BackendKind::Netconf).unwrap(),
            "Cannot delete: Interface loopback 66070077 (checked by Netconf)"
        );
        assert_eq!(
            config_failure(&Verb::Status, IF, BackendKind::Netconf).unwrap(),
            "No Interface loopback 66070077 (checked by Netconf)"
        );
        assert!(config_success(&Verb::ConfigBackup, IF, BackendKind::Netconf).is_none());
    }

    #[test]
    fn status_wording() {
        assert_eq!(
            status_report(InterfaceState::Enabled, IF, BackendKind::Restconf),
            "Interface loopback 66070077 is enabled (checked by Restconf)"
        );
        assert_eq!(
            status_report(InterfaceState::Disabled, IF, BackendKind::Netconf),
            "Interface loopback 66070077 is disabled (checked by Netconf)"
        );
    }
}
