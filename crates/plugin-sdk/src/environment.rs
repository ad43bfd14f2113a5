//! The negotiated environment a host passes to a plugin.
//!
//! Read once at startup through a lookup function so tests can supply a
//! map instead of touching the process environment.  Any missing variable
//! is a configuration error: the binary was not launched by a host.

use std::collections::{BTreeMap, HashMap};

use pw_protocol::{env, Address, ProtocolId, ProtocolSet};
use semver::Version;

use crate::types::PluginError;

const NOT_MANAGED: &str = "must run as a managed plugin";

/// Server role: the plugin listens where the host tells it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEnvironment {
    pub listen_address: Address,
    pub allowed_protocols: ProtocolSet,
    pub requested_version: Version,
}

/// Client role: the host offers one address per protocol and the plugin
/// picks one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnvironment {
    pub connect_addresses: BTreeMap<ProtocolId, Address>,
    pub supported_protocols: ProtocolSet,
    pub installed_version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiatedEnvironment {
    Server(ServerEnvironment),
    Client(ClientEnvironment),
}

impl NegotiatedEnvironment {
    pub fn from_process_env() -> Result<Self, PluginError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, PluginError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Detect the role and read its three variables.  Empty values count
    /// as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PluginError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(listen) = get(env::PLUGIN_LISTENER_ADDRESS) {
            let protocols = require(get(env::ALLOW_PLUGIN_RPC_PROTOCOL), env::ALLOW_PLUGIN_RPC_PROTOCOL)?;
            let version = require(get(env::REQUEST_VERSION), env::REQUEST_VERSION)?;
            return Ok(NegotiatedEnvironment::Server(ServerEnvironment {
                listen_address: Address::parse(listen.trim())?,
                allowed_protocols: parse_protocols(&protocols, env::ALLOW_PLUGIN_RPC_PROTOCOL)?,
                requested_version: parse_version(&version, env::REQUEST_VERSION)?,
            }));
        }

        if let Some(connect) = get(env::PLUGIN_CONNECT_ADDRESS) {
            let protocols = require(get(env::SUPPORT_RPC_PROTOCOL), env::SUPPORT_RPC_PROTOCOL)?;
            let version = require(get(env::INSTALLED_VERSION), env::INSTALLED_VERSION)?;
            return Ok(NegotiatedEnvironment::Client(ClientEnvironment {
                connect_addresses: parse_connect_addresses(&connect)?,
                supported_protocols: parse_protocols(&protocols, env::SUPPORT_RPC_PROTOCOL)?,
                installed_version: parse_version(&version, env::INSTALLED_VERSION)?,
            }));
        }

        Err(PluginError::config(format!(
            "{NOT_MANAGED}: neither {} nor {} is set",
            env::PLUGIN_LISTENER_ADDRESS,
            env::PLUGIN_CONNECT_ADDRESS
        )))
    }

    /// The version the host expects this plugin to be.
    pub fn requested_version(&self) -> &Version {
        match self {
            NegotiatedEnvironment::Server(s) => &s.requested_version,
            NegotiatedEnvironment::Client(c) => &c.installed_version,
        }
    }
}

fn require(value: Option<String>, key: &str) -> Result<String, PluginError> {
    value.ok_or_else(|| PluginError::config(format!("{NOT_MANAGED}: {key} is not set")))
}

fn parse_protocols(raw: &str, key: &str) -> Result<ProtocolSet, PluginError> {
    raw.parse()
        .map_err(|e| PluginError::config(format!("{key}: {e}")))
}

fn parse_version(raw: &str, key: &str) -> Result<Version, PluginError> {
    Version::parse(raw.trim()).map_err(|e| PluginError::config(format!("{key}: invalid version {raw:?}: {e}")))
}

/// `{"JsonRPCProtocol": "ws://127.0.0.1:9000/plugin", "1": "tcp://…"}`
fn parse_connect_addresses(raw: &str) -> Result<BTreeMap<ProtocolId, Address>, PluginError> {
    let entries: BTreeMap<String, String> = serde_json::from_str(raw).map_err(|e| {
        PluginError::config(format!(
            "{}: expected a JSON object of protocol to address: {e}",
            env::PLUGIN_CONNECT_ADDRESS
        ))
    })?;

    let mut addresses = BTreeMap::new();
    for (protocol, address) in entries {
        let protocol: ProtocolId = protocol
            .parse()
            .map_err(|e| PluginError::config(format!("{}: {e}", env::PLUGIN_CONNECT_ADDRESS)))?;
        addresses.insert(protocol, Address::parse(&address)?);
    }
    if addresses.is_empty() {
        return Err(PluginError::config(format!(
            "{}: no addresses offered",
            env::PLUGIN_CONNECT_ADDRESS
        )));
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn server_vars() -> HashMap<String, String> {
        vars(&[
            (env::PLUGIN_LISTENER_ADDRESS, "tcp://127.0.0.1:0"),
            (env::ALLOW_PLUGIN_RPC_PROTOCOL, "1"),
            (env::REQUEST_VERSION, "1.0.0"),
        ])
    }

    fn client_vars() -> HashMap<String, String> {
        vars(&[
            (
                env::PLUGIN_CONNECT_ADDRESS,
                r#"{"JsonRPCProtocol": "ws://127.0.0.1:9000/plugin"}"#,
            ),
            (env::SUPPORT_RPC_PROTOCOL, "JsonRPCProtocol"),
            (env::INSTALLED_VERSION, "1.0.0"),
        ])
    }

    #[test]
    fn reads_server_role() {
        let env = NegotiatedEnvironment::from_map(&server_vars()).unwrap();
        let NegotiatedEnvironment::Server(server) = env else {
            panic!("expected server role");
        };
        assert_eq!(server.listen_address.uri(), "tcp://127.0.0.1:0");
        assert!(server.allowed_protocols.contains(ProtocolId::BinaryRpc));
        assert_eq!(server.requested_version, Version::new(1, 0, 0));
    }

    #[test]
    fn reads_client_role() {
        let env = NegotiatedEnvironment::from_map(&client_vars()).unwrap();
        let NegotiatedEnvironment::Client(client) = env else {
            panic!("expected client role");
        };
        assert_eq!(
            client.connect_addresses[&ProtocolId::JsonRpc].uri(),
            "ws://127.0.0.1:9000/plugin"
        );
        assert!(client.supported_protocols.contains(ProtocolId::JsonRpc));
    }

    #[test]
    fn each_missing_server_variable_is_a_configuration_error() {
        for key in [
            env::PLUGIN_LISTENER_ADDRESS,
            env::ALLOW_PLUGIN_RPC_PROTOCOL,
            env::REQUEST_VERSION,
        ] {
            let mut v = server_vars();
            v.remove(key);
            let err = NegotiatedEnvironment::from_map(&v).unwrap_err();
            assert!(
                matches!(&err, PluginError::Configuration(m) if m.contains(key)),
                "missing {key} gave {err:?}"
            );
            assert!(err.is_startup_error());
        }
    }

    #[test]
    fn each_missing_client_variable_is_a_configuration_error() {
        for key in [
            env::PLUGIN_CONNECT_ADDRESS,
            env::SUPPORT_RPC_PROTOCOL,
            env::INSTALLED_VERSION,
        ] {
            let mut v = client_vars();
            v.remove(key);
            let err = NegotiatedEnvironment::from_map(&v).unwrap_err();
            assert!(matches!(err, PluginError::Configuration(_)), "missing {key}");
        }
    }

    #[test]
    fn empty_environment_is_not_managed() {
        let err = NegotiatedEnvironment::from_map(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("must run as a managed plugin"));
        assert!(err.is_startup_error());
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut v = server_vars();
        v.insert(env::REQUEST_VERSION.into(), "  ".into());
        assert!(matches!(
            NegotiatedEnvironment::from_map(&v),
            Err(PluginError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_listen_address() {
        let mut v = server_vars();
        v.insert(env::PLUGIN_LISTENER_ADDRESS.into(), "127.0.0.1:0".into());
        assert!(matches!(
            NegotiatedEnvironment::from_map(&v),
            Err(PluginError::MalformedAddress(_))
        ));
    }

    #[test]
    fn unknown_protocol_in_connect_map() {
        let mut v = client_vars();
        v.insert(
            env::PLUGIN_CONNECT_ADDRESS.into(),
            r#"{"CarrierPigeon": "tcp://127.0.0.1:1"}"#.into(),
        );
        assert!(matches!(
            NegotiatedEnvironment::from_map(&v),
            Err(PluginError::Configuration(_))
        ));
    }

    #[test]
    fn connect_map_must_be_json() {
        let mut v = client_vars();
        v.insert(env::PLUGIN_CONNECT_ADDRESS.into(), "ws://127.0.0.1:1".into());
        assert!(matches!(
            NegotiatedEnvironment::from_map(&v),
            Err(PluginError::Configuration(_))
        ));
    }
}
