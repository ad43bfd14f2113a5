//! Binary RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use pw_protocol::frame::decode_payload;
use pw_protocol::{Address, Frame, ReplyOutcome, Scheme, DEFAULT_MAX_FRAME_BYTES};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::HostError;

trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// One connection to a plugin's binary listener.
///
/// The stream lock is held for a full request/reply cycle, so concurrent
/// callers on one client are serialized.  Open more clients for
/// parallelism.
pub struct BinaryRpcClient {
    framed: Mutex<Framed<Box<dyn ByteStream>, LengthDelimitedCodec>>,
    next_id: AtomicU64,
}

impl BinaryRpcClient {
    pub async fn connect(address: &Address) -> Result<Self, HostError> {
        let stream: Box<dyn ByteStream> = match address.scheme() {
            Scheme::Tcp | Scheme::Tcp4 | Scheme::Tcp6 => {
                let stream = TcpStream::connect(address.endpoint()).await?;
                stream.set_nodelay(true)?;
                Box::new(stream)
            }
            #[cfg(unix)]
            Scheme::Unix => Box::new(tokio::net::UnixStream::connect(address.endpoint()).await?),
            _ => return Err(HostError::UnsupportedAddress(address.uri())),
        };

        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(DEFAULT_MAX_FRAME_BYTES)
            .new_codec();
        Ok(Self {
            framed: Mutex::new(Framed::new(stream, codec)),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn call(&self, service: &str, method: &str, params: Value) -> Result<Value, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::call(id, service, method, &params)?;

        let mut framed = self.framed.lock().await;
        framed.send(Bytes::from(frame.encode()?)).await?;

        loop {
            let bytes = framed.next().await.ok_or(HostError::Closed)??;
            match Frame::decode(&bytes)? {
                Frame::Reply { id: reply_id, outcome } if reply_id == id => {
                    return match outcome {
                        ReplyOutcome::Ok(payload) => Ok(decode_payload(&payload)?),
                        ReplyOutcome::Fault(fault) => Err(HostError::Fault(fault)),
                    };
                }
                Frame::Reply { id: other, .. } => {
                    tracing::warn!(expected = id, got = other, "discarding stale reply");
                }
                Frame::Call { .. } => {
                    return Err(HostError::UnexpectedReply("call frame from plugin".into()));
                }
            }
        }
    }
}

/// Dial `address`, make one call, and hang up.
pub async fn connect_and_call(
    address: &Address,
    service: &str,
    method: &str,
    params: Value,
) -> Result<Value, HostError> {
    BinaryRpcClient::connect(address)
        .await?
        .call(service, method, params)
        .await
}
