//! `scheme://endpoint` addresses used for listener binding and discovery.
//!
//! [`Address::parse`] only accepts the `scheme://endpoint` form.  Formatting
//! through [`Display`](std::fmt::Display) is *not* a perfect inverse: unix
//! sockets render as `unix:<path>` because that is the form the binary RPC
//! bind call expects.  Use [`Address::uri`] when the canonical
//! `scheme://endpoint` string is needed (handshake line, environment).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport schemes a plugin process understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    Unix,
    Tcp,
    Tcp4,
    Tcp6,
    /// WebSocket endpoint dialled by the JSON-RPC transport.
    Ws,
    /// TLS WebSocket endpoint dialled by the JSON-RPC transport.
    Wss,
}

impl Scheme {
    pub const ALL: [Scheme; 6] = [
        Scheme::Unix,
        Scheme::Tcp,
        Scheme::Tcp4,
        Scheme::Tcp6,
        Scheme::Ws,
        Scheme::Wss,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Unix => "unix",
            Scheme::Tcp => "tcp",
            Scheme::Tcp4 => "tcp4",
            Scheme::Tcp6 => "tcp6",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    /// `tcp`, `tcp4` or `tcp6`.
    pub const fn is_tcp(self) -> bool {
        matches!(self, Scheme::Tcp | Scheme::Tcp4 | Scheme::Tcp6)
    }

    /// `ws` or `wss`.
    pub const fn is_websocket(self) -> bool {
        matches!(self, Scheme::Ws | Scheme::Wss)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Scheme::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == lower)
            .ok_or_else(|| AddressError::UnsupportedScheme(s.to_string()))
    }
}

/// A malformed address.  Always fatal when raised during startup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address {0:?}: expected <scheme>://<endpoint>")]
    MissingSeparator(String),
    #[error("malformed address: unsupported scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("malformed address {0:?}: empty endpoint")]
    EmptyEndpoint(String),
}

/// A transport address: scheme plus scheme-specific endpoint
/// (`host:port`, a socket path, or `host:port/path` for WebSockets).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    scheme: Scheme,
    endpoint: String,
}

impl Address {
    pub fn new(scheme: Scheme, endpoint: impl Into<String>) -> Result<Self, AddressError> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(AddressError::EmptyEndpoint(format!("{scheme}://")));
        }
        Ok(Self { scheme, endpoint })
    }

    /// Parse `<scheme>://<endpoint>`.  The scheme is matched
    /// case-insensitively and must be one of [`Scheme::ALL`].
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let (scheme, endpoint) = input
            .split_once("://")
            .ok_or_else(|| AddressError::MissingSeparator(input.to_string()))?;
        let scheme: Scheme = scheme.parse()?;
        if endpoint.is_empty() {
            return Err(AddressError::EmptyEndpoint(input.to_string()));
        }
        Ok(Self {
            scheme,
            endpoint: endpoint.to_string(),
        })
    }

    /// Loopback TCP address with an OS-assigned port.
    pub fn ephemeral_tcp() -> Self {
        Self {
            scheme: Scheme::Tcp,
            endpoint: "127.0.0.1:0".into(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Canonical `scheme://endpoint` form for every scheme, including unix.
    pub fn uri(&self) -> String {
        format!("{}://{}", self.scheme, self.endpoint)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Unix => write!(f, "unix:{}", self.endpoint),
            scheme => write!(f, "{scheme}://{}", self.endpoint),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.uri()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_families() {
        let tcp: Vec<_> = Scheme::ALL.into_iter().filter(|s| s.is_tcp()).collect();
        assert_eq!(tcp, [Scheme::Tcp, Scheme::Tcp4, Scheme::Tcp6]);
        let ws: Vec<_> = Scheme::ALL.into_iter().filter(|s| s.is_websocket()).collect();
        assert_eq!(ws, [Scheme::Ws, Scheme::Wss]);
        assert!(!Scheme::Unix.is_tcp() && !Scheme::Unix.is_websocket());
    }

    #[test]
    fn tcp_addresses_round_trip() {
        for input in [
            "tcp://127.0.0.1:0",
            "tcp4://10.0.0.1:8080",
            "tcp6://[::1]:9000",
            "ws://127.0.0.1:9000/plugin",
        ] {
            let addr = Address::parse(input).unwrap();
            assert_eq!(addr.to_string(), input);
            assert_eq!(addr.uri(), input);
        }
    }

    #[test]
    fn unix_formats_without_slashes() {
        let addr = Address::parse("unix:///tmp/plugin.sock").unwrap();
        assert_eq!(addr.scheme(), Scheme::Unix);
        assert_eq!(addr.endpoint(), "/tmp/plugin.sock");
        assert_eq!(addr.to_string(), "unix:/tmp/plugin.sock");
        assert_eq!(addr.uri(), "unix:///tmp/plugin.sock");
    }

    #[test]
    fn unix_bind_form_does_not_parse_back() {
        // The formatted unix form is a bind target, not a discovery address.
        let formatted = Address::parse("unix:///tmp/plugin.sock").unwrap().to_string();
        assert_eq!(
            Address::parse(&formatted),
            Err(AddressError::MissingSeparator(formatted.clone()))
        );
    }

    #[test]
    fn missing_separator_rejected() {
        assert!(matches!(
            Address::parse("127.0.0.1:80"),
            Err(AddressError::MissingSeparator(_))
        ));
    }

    #[test]
    fn unknown_scheme_rejected() {
        assert_eq!(
            Address::parse("udp://127.0.0.1:53"),
            Err(AddressError::UnsupportedScheme("udp".into()))
        );
    }

    #[test]
    fn empty_endpoint_rejected() {
        assert!(matches!(
            Address::parse("tcp://"),
            Err(AddressError::EmptyEndpoint(_))
        ));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let addr = Address::parse("TCP://127.0.0.1:1").unwrap();
        assert_eq!(addr.scheme(), Scheme::Tcp);
    }

    #[test]
    fn serde_uses_uri_form() {
        let addr = Address::parse("unix:///run/p.sock").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"unix:///run/p.sock\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
