//! Plugin protocol: addresses, negotiation identifiers, handshake lines, and
//! the payloads both transports carry.
//!
//! A host launches a plugin with a handful of environment variables, waits
//! for the plugin's handshake on a reserved descriptor, then talks to it
//! over one of two interchangeable transports.  This crate holds the shared
//! vocabulary; `pw-plugin-sdk` implements the plugin side and
//! `pw-plugin-host` the consumer side.

pub mod address;
pub mod fault;
pub mod frame;
pub mod handshake;
pub mod jsonrpc;
pub mod messages;
pub mod protocol_id;

pub use address::{Address, AddressError, Scheme};
pub use fault::{Fault, FaultCode};
pub use frame::{Frame, FrameError, ReplyOutcome, DEFAULT_MAX_FRAME_BYTES};
pub use handshake::{HandshakeField, HandshakeLine, HandshakeParseError};
pub use messages::{
    CommandReply, CommandRequest, DeployRequest, ErrorStatus, HealthCheckRequest,
    HealthCheckResponse, HelpRequest, PluginInfo, ServingStatus,
};
pub use protocol_id::{ProtocolId, ProtocolIdError, ProtocolSet};

/// Version of the plugin/host core protocol itself, reported on the
/// `CoreVersion` handshake line.
pub const CORE_PROTOCOL_VERSION: &str = "1.0.0-rc1";

/// File descriptor the handshake is written to.
pub const HANDSHAKE_FD: i32 = 3;

/// Environment variables a host sets when launching a plugin.
pub mod env {
    /// Server role: `scheme://endpoint` the plugin must listen on.
    pub const PLUGIN_LISTENER_ADDRESS: &str = "ENV_PLUGIN_LISTENER_ADDRESS";
    /// Server role: protocols the host accepts.
    pub const ALLOW_PLUGIN_RPC_PROTOCOL: &str = "ENV_ALLOW_PLUGIN_RPC_PROTOCOL";
    /// Server role: plugin version the host asks for.
    pub const REQUEST_VERSION: &str = "ENV_REQUEST_VERSION";

    /// Client role: JSON object mapping protocol name to address.
    pub const PLUGIN_CONNECT_ADDRESS: &str = "ENV_PLUGIN_CONNECT_ADDRESS";
    /// Client role: protocols the host supports.
    pub const SUPPORT_RPC_PROTOCOL: &str = "ENV_SUPPORT_RPC_PROTOCOL";
    /// Client role: plugin version the host has installed.
    pub const INSTALLED_VERSION: &str = "ENV_INSTALLED_VERSION";
}

/// Well-known service names.
pub mod services {
    /// Initialize / Deploy / Uninitialize; live from the start.
    pub const LIFECYCLE: &str = "PluginInterface";
    /// Command application service, brought up by `Deploy("command")`.
    pub const COMMAND: &str = "command";
    /// Per-service serving status.
    pub const HEALTH: &str = "Health";
}

/// Method names, grouped by service.
pub mod methods {
    pub const INITIALIZATION: &str = "Initialization";
    pub const DEPLOY: &str = "Deploy";
    pub const UNINITIALIZATION: &str = "UnInitialization";

    pub const COMMAND: &str = "Command";
    pub const GET_HELP: &str = "GetHelp";
    pub const LIST_COMMAND: &str = "ListCommand";
    pub const GET_PLUGIN_INFO: &str = "GetPluginInfo";

    pub const CHECK: &str = "Check";

    /// Liveness probe answered for any service name.
    pub const PING: &str = "Ping";
}

/// Reply to [`methods::PING`].
pub const PONG: &str = "pong";
