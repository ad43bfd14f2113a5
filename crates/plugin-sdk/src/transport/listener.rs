//! Socket binding for the binary transport.

use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;

use pw_protocol::{Address, Scheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use crate::types::TransportError;

/// Any accepted byte stream.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Connection for T {}

pub enum Listener {
    Tcp {
        inner: TcpListener,
        scheme: Scheme,
    },
    #[cfg(unix)]
    Unix {
        inner: UnixListener,
        path: PathBuf,
    },
}

impl Listener {
    pub async fn bind(address: &Address) -> Result<Self, TransportError> {
        match address.scheme() {
            scheme @ (Scheme::Tcp | Scheme::Tcp4 | Scheme::Tcp6) => {
                let candidates = resolve(address.endpoint(), scheme).await?;
                let mut last_err = None;
                for addr in candidates {
                    match TcpListener::bind(addr).await {
                        Ok(inner) => return Ok(Listener::Tcp { inner, scheme }),
                        Err(e) => last_err = Some(e),
                    }
                }
                Err(TransportError::Io(last_err.unwrap_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::AddrNotAvailable,
                        format!("no {scheme} address for {}", address.endpoint()),
                    )
                })))
            }
            #[cfg(unix)]
            Scheme::Unix => {
                let path = PathBuf::from(address.endpoint());
                let inner = UnixListener::bind(&path)?;
                Ok(Listener::Unix { inner, path })
            }
            _ => Err(TransportError::UnusableAddress {
                address: address.uri(),
                protocol: pw_protocol::ProtocolId::BinaryRpc.to_string(),
            }),
        }
    }

    /// The address actually bound; an ephemeral port is resolved here.
    pub fn local_address(&self) -> Result<Address, TransportError> {
        match self {
            Listener::Tcp { inner, scheme } => {
                let local = inner.local_addr()?;
                Ok(Address::new(*scheme, local.to_string())?)
            }
            #[cfg(unix)]
            Listener::Unix { path, .. } => {
                Ok(Address::new(Scheme::Unix, path.to_string_lossy().into_owned())?)
            }
        }
    }

    pub async fn accept(&self) -> io::Result<(Box<dyn Connection>, String)> {
        match self {
            Listener::Tcp { inner, .. } => {
                let (stream, peer) = inner.accept().await?;
                stream.set_nodelay(true)?;
                Ok((Box::new(stream), peer.to_string()))
            }
            #[cfg(unix)]
            Listener::Unix { inner, path } => {
                let (stream, _) = inner.accept().await?;
                Ok((Box::new(stream), path.display().to_string()))
            }
        }
    }
}

#[cfg(unix)]
impl Drop for Listener {
    fn drop(&mut self) {
        if let Listener::Unix { path, .. } = self {
            if let Err(e) = std::fs::remove_file(&*path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove socket file");
                }
            }
        }
    }
}

/// Resolve `endpoint`, keeping only the address family the scheme names.
async fn resolve(endpoint: &str, scheme: Scheme) -> Result<Vec<SocketAddr>, TransportError> {
    let addrs = tokio::net::lookup_host(endpoint).await?;
    Ok(addrs
        .filter(|a| match scheme {
            Scheme::Tcp4 => a.is_ipv4(),
            Scheme::Tcp6 => a.is_ipv6(),
            _ => true,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_port_is_resolved() {
        let listener = Listener::bind(&Address::ephemeral_tcp()).await.unwrap();
        let local = listener.local_address().unwrap();
        assert_eq!(local.scheme(), Scheme::Tcp);
        assert!(local.endpoint().starts_with("127.0.0.1:"));
        assert!(!local.endpoint().ends_with(":0"));
    }

    #[tokio::test]
    async fn tcp4_rejects_ipv6_literal() {
        let addr = Address::parse("tcp4://[::1]:0").unwrap();
        assert!(Listener::bind(&addr).await.is_err());
    }

    #[tokio::test]
    async fn websocket_address_is_unusable() {
        let addr = Address::parse("ws://127.0.0.1:0/plugin").unwrap();
        assert!(matches!(
            Listener::bind(&addr).await,
            Err(TransportError::UnusableAddress { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_socket_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.sock");
        let addr = Address::new(Scheme::Unix, path.to_string_lossy().into_owned()).unwrap();

        let listener = Listener::bind(&addr).await.unwrap();
        assert!(path.exists());
        assert_eq!(listener.local_address().unwrap(), addr);
        drop(listener);
        assert!(!path.exists());
    }
}
