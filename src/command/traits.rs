use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verb tokens accepted after a target address, in the order operators see them listed.
pub const VALID_VERBS: &[&str] = &[
    "create",
    "delete",
    "enable",
    "disable",
    "status",
    "gigabit_status",
    "showrun",
];

/// One of the two interchangeable structured-config backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Restconf,
    Netconf,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Restconf, BackendKind::Netconf];

    /// Lowercase keyword operators type to select this backend.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Restconf => "restconf",
            Self::Netconf => "netconf",
        }
    }

    /// Capitalized name used in replies (`Ok: Restconf`, `checked by Netconf`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Restconf => "Restconf",
            Self::Netconf => "Netconf",
        }
    }

    pub fn from_keyword(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_keyword(s.trim())
            .ok_or_else(|| format!("unknown backend '{s}' (expected restconf or netconf)"))
    }
}

/// Device operation requested after a target address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Create,
    Delete,
    Enable,
    Disable,
    Status,
    InterfaceSummary,
    ConfigBackup,
    /// Anything else, carrying the raw token.
    Unknown(String),
}

impl Verb {
    /// Verb tokens are matched exactly; `Create` is not `create`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "create" => Self::Create,
            "delete" => Self::Delete,
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "status" => Self::Status,
            "gigabit_status" => Self::InterfaceSummary,
            "showrun" => Self::ConfigBackup,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Status => "status",
            Self::InterfaceSummary => "gigabit_status",
            Self::ConfigBackup => "showrun",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the verb needs a structured-config backend selected first.
    pub fn requires_backend(&self) -> bool {
        matches!(
            self,
            Self::Create | Self::Delete | Self::Enable | Self::Disable | Self::Status
        )
    }
}

/// Why a prefixed message could not be turned into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// Not addressed to this dispatcher. Never answered.
    MissingPrefix,
    NoCommand,
    NoMethodAndNoIpAndNoCommand,
    NoMethodSelected,
    NoIpSpecified,
    NoCommandFound,
    InvalidTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedCommand {
    SelectBackend { backend: BackendKind },
    DeviceCommand { target: String, verb: Verb },
    ParseError { reason: ErrorReason },
}

impl ParsedCommand {
    pub fn error(reason: ErrorReason) -> Self {
        Self::ParseError { reason }
    }

    /// True for messages that were not addressed to this dispatcher.
    pub fn is_unaddressed(&self) -> bool {
        matches!(
            self,
            Self::ParseError {
                reason: ErrorReason::MissingPrefix
            }
        )
    }
}

/// Turns raw chat text into a [`ParsedCommand`].
///
/// Implementations must be total and deterministic: the same text and the same
/// selected backend always produce the same result. The selected backend is
/// read-only input; parsers never change session state.
pub trait CommandParser: Send + Sync {
    fn parse(&self, raw: &str, selected: Option<BackendKind>) -> ParsedCommand;
    /// The address token a message must start with.
    fn address_prefix(&self) -> &str;
    fn name(&self) -> &str;
}
