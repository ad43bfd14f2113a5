use pw_protocol::jsonrpc::JsonRpcError;
use pw_protocol::{ErrorStatus, Fault, FrameError, HandshakeParseError, ProtocolId};

/// Errors seen by the consuming side of a plugin connection.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Handshake(#[from] HandshakeParseError),

    #[error("incompatible {field} version: expected {expected}, plugin offered {offered}")]
    IncompatibleVersion {
        field: &'static str,
        expected: String,
        offered: String,
    },

    #[error("plugin chose {0}, which this host does not allow")]
    ProtocolNotAllowed(ProtocolId),

    #[error("incomplete handshake: missing {0}")]
    IncompleteHandshake(&'static str),

    #[error("plugin exited before we could connect")]
    PluginExited,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("cannot reach {0} with this client")]
    UnsupportedAddress(String),

    #[error("call fault: {0}")]
    Fault(#[from] Fault),

    #[error("{0}")]
    Rpc(#[from] JsonRpcError),

    /// The plugin answered but declined the request.
    #[error("plugin declined: {0}")]
    Status(ErrorStatus),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("connection closed")]
    Closed,
}
