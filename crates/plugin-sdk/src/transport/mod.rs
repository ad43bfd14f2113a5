//! The two transports, selected once from the negotiated protocol.

pub mod binary;
pub mod json;
pub mod listener;

use std::sync::Arc;
use std::time::Duration;

use pw_protocol::{Address, ProtocolId, DEFAULT_MAX_FRAME_BYTES};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::negotiation::Negotiated;
use crate::types::TransportError;

pub use binary::BinaryRpcServer;
pub use json::JsonRpcConnection;

/// Transport tunables, set through the plugin builder.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub max_concurrent_calls: usize,
    pub connect_timeout: Duration,
    pub max_frame_bytes: usize,
    pub json_path: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 16,
            connect_timeout: Duration::from_secs(10),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            json_path: "/plugin".into(),
        }
    }
}

pub enum Transport {
    BinaryRpc(BinaryRpcServer),
    PersistentJson(JsonRpcConnection),
}

impl Transport {
    /// Bind (binary) or dial (JSON-RPC) according to the negotiated protocol.
    pub async fn open(negotiated: &Negotiated, settings: TransportSettings) -> Result<Self, TransportError> {
        match negotiated.protocol {
            ProtocolId::BinaryRpc => Ok(Transport::BinaryRpc(
                BinaryRpcServer::bind(&negotiated.address, settings).await?,
            )),
            ProtocolId::JsonRpc => Ok(Transport::PersistentJson(
                JsonRpcConnection::connect(&negotiated.address, settings).await?,
            )),
        }
    }

    pub fn protocol(&self) -> ProtocolId {
        match self {
            Transport::BinaryRpc(_) => ProtocolId::BinaryRpc,
            Transport::PersistentJson(_) => ProtocolId::JsonRpc,
        }
    }

    /// The address to announce in the handshake.
    pub fn address(&self) -> Result<Address, TransportError> {
        match self {
            Transport::BinaryRpc(server) => server.local_address(),
            Transport::PersistentJson(conn) => Ok(conn.address().clone()),
        }
    }

    pub async fn serve(self, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) -> Result<(), TransportError> {
        match self {
            Transport::BinaryRpc(server) => server.serve(dispatcher, shutdown).await,
            Transport::PersistentJson(conn) => conn.serve(dispatcher, shutdown).await,
        }
    }
}
