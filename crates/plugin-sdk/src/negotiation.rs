//! Pick one protocol and one address from the negotiated environment.
//!
//! Version checking happens here too, so every fatal startup error is
//! raised before a transport is opened.

use pw_protocol::{Address, ProtocolId, ProtocolSet};
use semver::Version;

use crate::environment::NegotiatedEnvironment;
use crate::types::PluginError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The host published a listener address.
    Server,
    /// The host offered one address per protocol.
    Client,
}

/// Outcome of negotiation: what to open and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub role: Role,
    pub protocol: ProtocolId,
    pub address: Address,
    pub version: Version,
}

impl Negotiated {
    /// Binary RPC always listens; JSON-RPC always dials out to an address
    /// the host already published.
    pub fn listens(&self) -> bool {
        self.protocol == ProtocolId::BinaryRpc
    }
}

/// Resolve the environment against the compiled-in version.
///
/// Server role prefers the binary protocol and falls back to JSON-RPC when
/// that is all the host allows.  Client role defers to `choose`, which sees
/// the host's supported set and must pick a protocol the host also offered
/// an address for.
pub fn negotiate(
    env: &NegotiatedEnvironment,
    compiled: &Version,
    choose: impl FnOnce(&ProtocolSet) -> Option<ProtocolId>,
) -> Result<Negotiated, PluginError> {
    let requested = env.requested_version();
    if requested != compiled {
        return Err(PluginError::VersionMismatch {
            requested: requested.to_string(),
            compiled: compiled.to_string(),
        });
    }

    let (role, protocol, address) = match env {
        NegotiatedEnvironment::Server(server) => {
            let protocol = [ProtocolId::BinaryRpc, ProtocolId::JsonRpc]
                .into_iter()
                .find(|p| server.allowed_protocols.contains(*p))
                .ok_or_else(|| {
                    PluginError::config(format!(
                        "no common protocol in {}",
                        server.allowed_protocols
                    ))
                })?;
            (Role::Server, protocol, server.listen_address.clone())
        }
        NegotiatedEnvironment::Client(client) => {
            let protocol = choose(&client.supported_protocols).ok_or_else(|| {
                PluginError::config(format!(
                    "no protocol selected from {}",
                    client.supported_protocols
                ))
            })?;
            if !client.supported_protocols.contains(protocol) {
                return Err(PluginError::config(format!(
                    "{protocol} is not supported by the host ({})",
                    client.supported_protocols
                )));
            }
            let address = client.connect_addresses.get(&protocol).ok_or_else(|| {
                PluginError::config(format!("host offered no address for {protocol}"))
            })?;
            (Role::Client, protocol, address.clone())
        }
    };

    if !protocol.accepts_scheme(address.scheme()) {
        return Err(PluginError::config(format!(
            "{protocol} cannot use address {}",
            address.uri()
        )));
    }

    Ok(Negotiated {
        role,
        protocol,
        address,
        version: compiled.clone(),
    })
}
