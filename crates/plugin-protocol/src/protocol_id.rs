//! Negotiable transport identifiers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Scheme;

/// A transport + encoding pair both sides can agree on.
///
/// Each id has a numeric form (used on the handshake line) and a name
/// (used as the key of the connect-address map).  Either form parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolId {
    /// Length-delimited binary frames over a listening socket.
    BinaryRpc,
    /// JSON-RPC 2.0 over one persistent WebSocket the plugin dials.
    JsonRpc,
}

impl ProtocolId {
    pub const ALL: [ProtocolId; 2] = [ProtocolId::BinaryRpc, ProtocolId::JsonRpc];

    pub const fn id(self) -> u32 {
        match self {
            ProtocolId::BinaryRpc => 1,
            ProtocolId::JsonRpc => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ProtocolId::BinaryRpc => "BinaryRPCProtocol",
            ProtocolId::JsonRpc => "JsonRPCProtocol",
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        ProtocolId::ALL.into_iter().find(|p| p.id() == id)
    }

    /// Whether an address with `scheme` can carry this protocol.
    pub const fn accepts_scheme(self, scheme: Scheme) -> bool {
        match self {
            ProtocolId::BinaryRpc => matches!(scheme, Scheme::Unix) || scheme.is_tcp(),
            ProtocolId::JsonRpc => scheme.is_tcp() || scheme.is_websocket(),
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolIdError {
    #[error("unknown RPC protocol {0:?}")]
    Unknown(String),
    #[error("protocol set is empty")]
    Empty,
}

impl FromStr for ProtocolId {
    type Err = ProtocolIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u32>() {
            return ProtocolId::from_id(id).ok_or_else(|| ProtocolIdError::Unknown(s.to_string()));
        }
        ProtocolId::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ProtocolIdError::Unknown(s.to_string()))
    }
}

impl TryFrom<String> for ProtocolId {
    type Error = ProtocolIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolId> for String {
    fn from(p: ProtocolId) -> Self {
        p.name().to_string()
    }
}

/// Non-empty set of protocol ids, written as a comma separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSet(BTreeSet<ProtocolId>);

impl ProtocolSet {
    pub fn new(ids: impl IntoIterator<Item = ProtocolId>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: ProtocolId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProtocolId> + '_ {
        self.0.iter().copied()
    }
}

impl FromStr for ProtocolSet {
    type Err = ProtocolIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if ids.is_empty() {
            return Err(ProtocolIdError::Empty);
        }
        Ok(Self(ids))
    }
}

/// Renders numeric ids (`1,2`), the form hosts put in the environment.
impl fmt::Display for ProtocolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(|p| p.id().to_string()).collect();
        f.write_str(&ids.join(","))
    }
}
