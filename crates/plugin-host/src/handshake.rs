//! Reading a plugin's handshake.

use std::time::Duration;

use pw_protocol::handshake::{compatible, parse_line};
use pw_protocol::{Address, HandshakeField, HandshakeLine, ProtocolId, ProtocolSet, CORE_PROTOCOL_VERSION};
use semver::Version;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::HostError;

/// How long a freshly launched plugin has to finish its handshake.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(60);

/// What the host requires of the handshake.
#[derive(Debug, Clone)]
pub struct HandshakeExpectations {
    pub core_version: Version,
    pub version: Version,
    pub allowed_protocols: ProtocolSet,
    pub timeout: Duration,
}

impl HandshakeExpectations {
    /// Expect this crate's core protocol and the given plugin version.
    pub fn new(version: Version, allowed_protocols: ProtocolSet) -> Self {
        Self {
            core_version: Version::parse(CORE_PROTOCOL_VERSION)
                .unwrap_or_else(|_| Version::new(1, 0, 0)),
            version,
            allowed_protocols,
            timeout: DEFAULT_START_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Read `key: value` lines until `DONE:`, validating as they arrive.
pub async fn read_handshake<R>(reader: R, expect: &HandshakeExpectations) -> Result<HandshakeLine, HostError>
where
    R: AsyncBufRead + Unpin,
{
    tokio::time::timeout(expect.timeout, read_lines(reader, expect))
        .await
        .map_err(|_| HostError::Timeout("plugin handshake"))?
}

async fn read_lines<R>(mut reader: R, expect: &HandshakeExpectations) -> Result<HandshakeLine, HostError>
where
    R: AsyncBufRead + Unpin,
{
    let mut core_version: Option<Version> = None;
    let mut version: Option<Version> = None;
    let mut address: Option<Address> = None;
    let mut protocol: Option<ProtocolId> = None;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(HostError::PluginExited);
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line)? {
            HandshakeField::CoreVersion(v) => {
                check_version("core protocol", &expect.core_version, &v)?;
                core_version = Some(v);
            }
            HandshakeField::Version(v) => {
                check_version("plugin", &expect.version, &v)?;
                version = Some(v);
            }
            HandshakeField::Address(a) => address = Some(a),
            HandshakeField::RpcProtocol(p) => {
                if !expect.allowed_protocols.contains(p) {
                    return Err(HostError::ProtocolNotAllowed(p));
                }
                protocol = Some(p);
            }
            HandshakeField::Done => break,
        }
    }

    let handshake = HandshakeLine {
        core_version: core_version.ok_or(HostError::IncompleteHandshake("CoreVersion"))?,
        version: version.ok_or(HostError::IncompleteHandshake("Version"))?,
        address: address.ok_or(HostError::IncompleteHandshake("Address"))?,
        protocol: protocol.ok_or(HostError::IncompleteHandshake("RPCProtocol"))?,
    };
    tracing::debug!(
        address = %handshake.address.uri(),
        protocol = %handshake.protocol,
        "plugin handshake complete"
    );
    Ok(handshake)
}

fn check_version(field: &'static str, expected: &Version, offered: &Version) -> Result<(), HostError> {
    if compatible(expected, offered) {
        Ok(())
    } else {
        Err(HostError::IncompatibleVersion {
            field,
            expected: expected.to_string(),
            offered: offered.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect() -> HandshakeExpectations {
        HandshakeExpectations::new(Version::new(1, 0, 0), "1,2".parse().unwrap())
    }

    const GOOD: &str = "CoreVersion: 1.0.0-rc1\nVersion: 1.0.0\nAddress: tcp://127.0.0.1:4000\nRPCProtocol: 1\nDONE:\n";

    #[tokio::test]
    async fn reads_complete_handshake() {
        let hs = read_handshake(GOOD.as_bytes(), &expect()).await.unwrap();
        assert_eq!(hs.address.uri(), "tcp://127.0.0.1:4000");
        assert_eq!(hs.protocol, ProtocolId::BinaryRpc);
    }

    #[tokio::test]
    async fn newer_minor_is_accepted() {
        let text = GOOD.replace("Version: 1.0.0\n", "Version: 1.2.0\n");
        assert!(read_handshake(text.as_bytes(), &expect()).await.is_ok());
    }

    #[tokio::test]
    async fn other_major_is_rejected() {
        let text = GOOD.replace("Version: 1.0.0\n", "Version: 2.0.0\n");
        assert!(matches!(
            read_handshake(text.as_bytes(), &expect()).await,
            Err(HostError::IncompatibleVersion { field: "plugin", .. })
        ));
    }

    #[tokio::test]
    async fn disallowed_protocol_is_rejected() {
        let expect = HandshakeExpectations::new(Version::new(1, 0, 0), "2".parse().unwrap());
        assert!(matches!(
            read_handshake(GOOD.as_bytes(), &expect).await,
            Err(HostError::ProtocolNotAllowed(ProtocolId::BinaryRpc))
        ));
    }

    #[tokio::test]
    async fn eof_before_done_means_plugin_exited() {
        let text = "CoreVersion: 1.0.0-rc1\nVersion: 1.0.0\n";
        assert!(matches!(
            read_handshake(text.as_bytes(), &expect()).await,
            Err(HostError::PluginExited)
        ));
    }

    #[tokio::test]
    async fn stray_output_is_unrecognized() {
        let text = format!("starting up...\n{GOOD}");
        assert!(matches!(
            read_handshake(text.as_bytes(), &expect()).await,
            Err(HostError::Handshake(_))
        ));
    }

    #[tokio::test]
    async fn done_without_address_is_incomplete() {
        let text = "CoreVersion: 1.0.0-rc1\nVersion: 1.0.0\nRPCProtocol: 1\nDONE:\n";
        assert!(matches!(
            read_handshake(text.as_bytes(), &expect()).await,
            Err(HostError::IncompleteHandshake("Address"))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_plugin_times_out() {
        let (_writer, reader) = tokio::io::duplex(64);
        let expect = expect().timeout(Duration::from_secs(5));
        let result = read_handshake(tokio::io::BufReader::new(reader), &expect).await;
        assert!(matches!(result, Err(HostError::Timeout(_))));
    }
}
