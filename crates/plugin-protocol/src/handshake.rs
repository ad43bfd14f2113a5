//! The one-time handshake a plugin writes after its transport is ready.
//!
//! ```text
//! CoreVersion: 1.0.0-rc1
//! Version: 1.0.0
//! Address: tcp://127.0.0.1:41237
//! RPCProtocol: 1
//! DONE:
//! ```

use semver::Version;

use crate::address::{Address, AddressError};
use crate::protocol_id::{ProtocolId, ProtocolIdError};

pub const KEY_CORE_VERSION: &str = "CoreVersion";
pub const KEY_VERSION: &str = "Version";
pub const KEY_ADDRESS: &str = "Address";
pub const KEY_RPC_PROTOCOL: &str = "RPCProtocol";
pub const KEY_DONE: &str = "DONE";

/// Everything a host learns from the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeLine {
    pub core_version: Version,
    pub version: Version,
    /// The address actually bound or dialled, not necessarily the requested one.
    pub address: Address,
    pub protocol: ProtocolId,
}

impl HandshakeLine {
    /// Render the five newline-terminated lines, `DONE:` last.
    pub fn render(&self) -> String {
        format!(
            "{KEY_CORE_VERSION}: {}\n{KEY_VERSION}: {}\n{KEY_ADDRESS}: {}\n{KEY_RPC_PROTOCOL}: {}\n{KEY_DONE}:\n",
            self.core_version,
            self.version,
            self.address.uri(),
            self.protocol.id(),
        )
    }
}

/// One parsed handshake line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeField {
    CoreVersion(Version),
    Version(Version),
    Address(Address),
    RpcProtocol(ProtocolId),
    Done,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeParseError {
    #[error("unrecognized remote plugin message: {0}")]
    Unrecognized(String),
    #[error("invalid version {value:?}: {reason}")]
    Version { value: String, reason: String },
    #[error("unsupported address format: {0}")]
    Address(#[from] AddressError),
    #[error(transparent)]
    Protocol(#[from] ProtocolIdError),
}

/// Parse one `key: value` line.  Keys match case-insensitively and both
/// halves are trimmed.
pub fn parse_line(line: &str) -> Result<HandshakeField, HandshakeParseError> {
    let line = line.trim();
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| HandshakeParseError::Unrecognized(line.to_string()))?;
    let key = key.trim();
    let value = value.trim();

    if key.eq_ignore_ascii_case(KEY_CORE_VERSION) {
        Ok(HandshakeField::CoreVersion(parse_version(value)?))
    } else if key.eq_ignore_ascii_case(KEY_VERSION) {
        Ok(HandshakeField::Version(parse_version(value)?))
    } else if key.eq_ignore_ascii_case(KEY_ADDRESS) {
        Ok(HandshakeField::Address(Address::parse(value)?))
    } else if key.eq_ignore_ascii_case(KEY_RPC_PROTOCOL) {
        Ok(HandshakeField::RpcProtocol(value.parse()?))
    } else if key.eq_ignore_ascii_case(KEY_DONE) {
        Ok(HandshakeField::Done)
    } else {
        Err(HandshakeParseError::Unrecognized(line.to_string()))
    }
}

fn parse_version(value: &str) -> Result<Version, HandshakeParseError> {
    Version::parse(value).map_err(|e| HandshakeParseError::Version {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// `offered` can serve a consumer built against `expected`: same major
/// version and the expected minor is not newer than the offered one.
pub fn compatible(expected: &Version, offered: &Version) -> bool {
    expected.major == offered.major && expected.minor <= offered.minor
}
