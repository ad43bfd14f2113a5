//! Request and reply payloads shared by both transports.
//!
//! Every lifecycle and command call answers with these shapes regardless of
//! the transport, so a host sees the same error payload over binary frames
//! and over JSON-RPC.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform per-call error payload.  An empty `message` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Vec<u8>>,
}

impl ErrorStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Vec<u8>>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.message.is_empty()
    }

    pub fn into_result(self) -> Result<(), ErrorStatus> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            f.write_str("ok")
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for ErrorStatus {}

/// Identity reported by `GetPluginInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
}

/// Health of a single named service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
    /// The name was never deployed on this listener.
    ServiceUnknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRequest {
    /// Empty string asks about the listener as a whole.
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: ServingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// `GetHelp` parameters: a bare subcommand string or `{ "name": … }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HelpRequest {
    Bare(String),
    Named {
        #[serde(alias = "subcommand")]
        name: String,
    },
}

impl HelpRequest {
    pub fn subcommand(&self) -> &str {
        match self {
            HelpRequest::Bare(name) | HelpRequest::Named { name } => name,
        }
    }
}

/// Outcome of `Command`.  `Unrecognized` is a normal reply, not a fault:
/// the plugin simply has no command by that name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandReply {
    Output { value: Value },
    Failed { status: ErrorStatus },
    Unrecognized,
}

impl CommandReply {
    pub fn into_option(self) -> Option<Result<Value, ErrorStatus>> {
        match self {
            CommandReply::Output { value } => Some(Ok(value)),
            CommandReply::Failed { status } => Some(Err(status)),
            CommandReply::Unrecognized => None,
        }
    }
}

impl From<Option<Result<Value, ErrorStatus>>> for CommandReply {
    fn from(outcome: Option<Result<Value, ErrorStatus>>) -> Self {
        match outcome {
            Some(Ok(value)) => CommandReply::Output { value },
            Some(Err(status)) => CommandReply::Failed { status },
            None => CommandReply::Unrecognized,
        }
    }
}
