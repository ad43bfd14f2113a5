//! Error types for the plugin side.

use pw_protocol::{AddressError, ErrorStatus, FrameError};

/// Top-level SDK error.
///
/// `Configuration`, `VersionMismatch` and `MalformedAddress` are raised while
/// building a [`Plugin`](crate::Plugin), before any socket exists; a process
/// that sees one should print it and exit non-zero.
#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("version mismatch: host requested {requested}, plugin is {compiled}")]
    VersionMismatch { requested: String, compiled: String },
    #[error(transparent)]
    MalformedAddress(#[from] AddressError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("handshake: {0}")]
    Handshake(#[source] std::io::Error),
}

impl PluginError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        PluginError::Configuration(message.into())
    }

    /// Whether this error aborts startup (as opposed to a failure while serving).
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            PluginError::Configuration(_)
                | PluginError::VersionMismatch { .. }
                | PluginError::MalformedAddress(_)
        )
    }
}

/// Socket-level failures.  While serving, the binary transport logs these
/// per connection and keeps accepting; the JSON transport closes its single
/// connection and surfaces the error from `run`.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("cannot use {address} for {protocol}")]
    UnusableAddress { address: String, protocol: String },
}

/// Error returned by a command callback.  Reaches the host as the
/// `ErrorStatus` of a `failed` command reply.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CommandError {
    pub message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<CommandError> for ErrorStatus {
    fn from(err: CommandError) -> Self {
        ErrorStatus::new(err.message)
    }
}
