//! Host end of the JSON-RPC transport.
//!
//! The host listens; the plugin dials in.  [`JsonRpcAcceptor`] publishes
//! the address handed to the plugin, and each accepted socket becomes a
//! [`JsonRpcPeer`] the host can call.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use pw_protocol::jsonrpc::{join_method, JsonRpcRequest, JsonRpcResponse};
use pw_protocol::{Address, Scheme};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::HostError;

pub struct JsonRpcAcceptor {
    listener: TcpListener,
}

impl JsonRpcAcceptor {
    pub async fn bind(endpoint: &str) -> Result<Self, HostError> {
        Ok(Self {
            listener: TcpListener::bind(endpoint).await?,
        })
    }

    /// `tcp://host:port` of the bound listener.
    pub fn address(&self) -> Result<Address, HostError> {
        let local = self.listener.local_addr()?;
        Address::new(Scheme::Tcp, local.to_string())
            .map_err(|e| HostError::UnsupportedAddress(e.to_string()))
    }

    /// `ws://host:port<path>`, the form offered in the connect-address map.
    pub fn websocket_address(&self, path: &str) -> Result<Address, HostError> {
        let local = self.listener.local_addr()?;
        Address::new(Scheme::Ws, format!("{local}{path}"))
            .map_err(|e| HostError::UnsupportedAddress(e.to_string()))
    }

    /// Wait for the plugin to dial in and complete the WebSocket upgrade.
    pub async fn accept(&self) -> Result<JsonRpcPeer, HostError> {
        let (stream, peer) = self.listener.accept().await?;
        let socket = tokio_tungstenite::accept_async(stream).await?;
        tracing::info!(peer = %peer, "plugin connected");
        Ok(JsonRpcPeer {
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(1),
        })
    }
}

/// A connected plugin.  Calls are serialized on the socket lock, matching
/// the plugin's in-order reader loop.
pub struct JsonRpcPeer {
    socket: Mutex<WebSocketStream<TcpStream>>,
    next_id: AtomicU64,
}

impl JsonRpcPeer {
    pub async fn call(&self, service: &str, method: &str, params: Value) -> Result<Value, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, join_method(service, method), Some(params));
        let text = serde_json::to_string(&req)?;

        let mut socket = self.socket.lock().await;
        socket.send(Message::Text(text)).await?;

        loop {
            let msg = socket.next().await.ok_or(HostError::Closed)??;
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => return Err(HostError::Closed),
                _ => continue,
            };
            let resp: JsonRpcResponse = serde_json::from_str(&text)?;
            if resp.id != Value::from(id) {
                tracing::warn!(expected = id, got = %resp.id, "discarding uncorrelated response");
                continue;
            }
            return Ok(resp.into_result()?);
        }
    }

    /// Fire-and-forget; the plugin sends nothing back.
    pub async fn notify(&self, service: &str, method: &str, params: Value) -> Result<(), HostError> {
        let req = JsonRpcRequest::notification(join_method(service, method), Some(params));
        let text = serde_json::to_string(&req)?;
        self.socket.lock().await.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), HostError> {
        self.socket.lock().await.close(None).await?;
        Ok(())
    }
}
