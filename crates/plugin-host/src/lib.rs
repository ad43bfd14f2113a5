//! `pw-plugin-host`: the consuming side of the subprocess-plugin protocol.
//!
//! Process supervision stays with the caller.  This crate reads the
//! handshake a launched plugin writes, checks it against what the host
//! expects, and makes calls over whichever transport the plugin chose:
//!
//! - [`read_handshake`] parses and validates the five handshake lines
//! - [`BinaryRpcClient`] dials a plugin's binary listener
//! - [`JsonRpcAcceptor`] publishes an address and accepts the plugin's
//!   outbound WebSocket as a [`JsonRpcPeer`]
//! - [`PluginClient`] wraps either with typed lifecycle, command and
//!   health calls

pub mod binary;
pub mod client;
pub mod error;
pub mod handshake;
pub mod json;

pub use binary::{connect_and_call, BinaryRpcClient};
pub use client::{Channel, PluginClient};
pub use error::HostError;
pub use handshake::{read_handshake, HandshakeExpectations, DEFAULT_START_TIMEOUT};
pub use json::{JsonRpcAcceptor, JsonRpcPeer};
