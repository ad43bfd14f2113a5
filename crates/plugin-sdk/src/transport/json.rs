//! JSON-RPC over one persistent WebSocket the plugin dials out on.
//!
//! Frames are handled strictly in arrival order by a single reader loop;
//! each response is written before the next frame is read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use pw_protocol::jsonrpc::{self, JsonRpcError, JsonRpcResponse};
use pw_protocol::Address;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::transport::TransportSettings;
use crate::types::TransportError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// URL the plugin dials for `address`: `ws://<endpoint><path>` for TCP
/// schemes, the address itself for `ws`/`wss`.
pub fn websocket_url(address: &Address, path: &str) -> Result<String, TransportError> {
    let scheme = address.scheme();
    if scheme.is_websocket() {
        return Ok(address.uri());
    }
    if !scheme.is_tcp() {
        return Err(TransportError::UnusableAddress {
            address: address.uri(),
            protocol: pw_protocol::ProtocolId::JsonRpc.to_string(),
        });
    }
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("ws://{}{path}", address.endpoint()))
}

pub struct JsonRpcConnection {
    socket: Socket,
    address: Address,
}

impl JsonRpcConnection {
    /// Dial the host.  `connect_timeout` bounds the TCP and WebSocket
    /// handshake together.  Messages above `max_frame_bytes` are refused by
    /// the socket before they are buffered, which ends the connection.
    pub async fn connect(address: &Address, settings: TransportSettings) -> Result<Self, TransportError> {
        let url = websocket_url(address, &settings.json_path)?;
        tracing::info!(url = %url, max_bytes = settings.max_frame_bytes, "connecting to host");

        let connect = tokio_tungstenite::connect_async_with_config(
            &url,
            Some(socket_config(settings.max_frame_bytes)),
            false,
        );
        let (socket, _response) = tokio::time::timeout(settings.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::ConnectTimeout(url.clone()))??;

        Ok(Self {
            socket,
            address: address.clone(),
        })
    }

    /// The address that was dialled, reported in the handshake.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Serve until the host closes, the socket fails, or `shutdown` fires.
    /// The socket is closed exactly once on every path.
    pub async fn serve(
        self,
        dispatcher: Arc<Dispatcher>,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        let (mut sink, mut stream) = self.socket.split();
        let closer = CloseOnce::default();

        let result: Result<(), TransportError> = async {
            loop {
                let msg = tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    msg = stream.next() => msg,
                };
                let text = match msg {
                    None => return Ok(()),
                    Some(Err(e)) => return Err(TransportError::WebSocket(e)),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("host closed connection");
                        return Ok(());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = JsonRpcError::new(jsonrpc::INVALID_REQUEST, "binary frames are not supported");
                        send(&mut sink, &JsonRpcResponse::failure(Value::Null, err)).await?;
                        continue;
                    }
                    Some(Ok(_)) => continue,
                };

                if let Some(response) = handle_text(&dispatcher, &text).await {
                    send(&mut sink, &response).await?;
                }
            }
        }
        .await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "json-rpc connection failed");
            closer.close(&mut sink).await;
        }
        closer.close(&mut sink).await;
        result
    }
}

fn socket_config(max_bytes: usize) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(max_bytes);
    config.max_frame_size = Some(max_bytes);
    config
}

/// Handle one text frame.  Returns `None` for notifications.
pub async fn handle_text(dispatcher: &Dispatcher, text: &str) -> Option<JsonRpcResponse> {
    let req = match jsonrpc::parse_request(text) {
        Ok(req) => req,
        Err(e) => return Some(JsonRpcResponse::failure(e.id, e.error)),
    };
    let notification = req.is_notification();
    let id = req.id.clone().unwrap_or(Value::Null);

    let result = match req.service_and_method() {
        Some((service, method)) => dispatcher
            .dispatch(service, method, req.params.clone().unwrap_or(Value::Null))
            .await
            .map_err(JsonRpcError::from),
        None => Err(JsonRpcError::new(
            jsonrpc::METHOD_NOT_FOUND,
            format!("method must be <Service>.<Method>: {}", req.method),
        )),
    };

    if notification {
        if let Err(e) = result {
            tracing::debug!(method = %req.method, error = %e, "notification failed");
        }
        return None;
    }
    let response = match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::failure(id, err),
    };
    if response.is_error() {
        tracing::debug!(method = %req.method, "request answered with an error");
    }
    Some(response)
}

async fn send(sink: &mut SplitSink<Socket, Message>, response: &JsonRpcResponse) -> Result<(), TransportError> {
    let text = serde_json::to_string(response).map_err(|e| {
        TransportError::Frame(pw_protocol::FrameError::Payload(e))
    })?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// One-shot guard around socket close.
#[derive(Debug, Default)]
pub struct CloseOnce {
    closed: AtomicBool,
}

impl CloseOnce {
    /// True the first time only.
    pub fn claim(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self, sink: &mut SplitSink<Socket, Message>) {
        if !self.claim() {
            return;
        }
        if let Err(e) = sink.close().await {
            tracing::debug!(error = %e, "websocket close");
        }
        tracing::info!("json-rpc connection closed");
    }
}
