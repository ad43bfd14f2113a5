//! Binary RPC transport: listen-many, length-delimited postcard frames.
//!
//! Each accepted connection gets a reader loop and a writer task.  Every
//! inbound call runs as its own task gated by one semaphore shared across
//! connections, so replies may go out in any order; the frame id ties
//! them back to their call.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use pw_protocol::{Address, Frame};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::dispatch::Dispatcher;
use crate::transport::listener::{Connection, Listener};
use crate::transport::TransportSettings;
use crate::types::TransportError;

pub struct BinaryRpcServer {
    listener: Listener,
    settings: TransportSettings,
}

impl BinaryRpcServer {
    pub async fn bind(address: &Address, settings: TransportSettings) -> Result<Self, TransportError> {
        let listener = Listener::bind(address).await?;
        Ok(Self { listener, settings })
    }

    pub fn local_address(&self) -> Result<Address, TransportError> {
        self.listener.local_address()
    }

    /// Accept connections until `shutdown` fires, then wait for in-flight
    /// calls to finish and their replies to be written.
    pub async fn serve(
        self,
        dispatcher: Arc<Dispatcher>,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        let tracker = TaskTracker::new();
        let workers = Arc::new(Semaphore::new(self.settings.max_concurrent_calls.max(1)));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer = %peer, "binary connection accepted");
                        let conn = ConnectionTask {
                            dispatcher: Arc::clone(&dispatcher),
                            workers: Arc::clone(&workers),
                            tracker: tracker.clone(),
                            shutdown: shutdown.clone(),
                            max_frame_bytes: self.settings.max_frame_bytes,
                        };
                        tracker.spawn(async move {
                            if let Err(e) = conn.run(stream).await {
                                tracing::warn!(peer = %peer, error = %e, "binary connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracker.close();
        tracing::info!(in_flight = tracker.len(), "draining binary transport");
        tracker.wait().await;
        Ok(())
    }
}

struct ConnectionTask {
    dispatcher: Arc<Dispatcher>,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    max_frame_bytes: usize,
}

impl ConnectionTask {
    async fn run(self, stream: Box<dyn Connection>) -> Result<(), TransportError> {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(self.max_frame_bytes)
            .new_codec();
        let (mut sink, mut frames) = Framed::new(stream, codec).split();

        let (reply_tx, mut reply_rx) = mpsc::channel::<Frame>(64);
        let writer = tokio::spawn(async move {
            while let Some(frame) = reply_rx.recv().await {
                let bytes = match frame.encode() {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode reply frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Bytes::from(bytes)).await {
                    tracing::warn!(error = %e, "failed to write reply frame");
                    break;
                }
            }
        });

        let result = loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),
                next = frames.next() => next,
            };
            let bytes = match next {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => break Err(TransportError::Io(e)),
                None => break Ok(()),
            };
            match Frame::decode(&bytes) {
                Ok(Frame::Call {
                    id,
                    service,
                    method,
                    payload,
                }) => self.spawn_call(id, service, method, payload, reply_tx.clone()),
                Ok(Frame::Reply { id, .. }) => {
                    tracing::warn!(id, "unexpected reply frame from host, ignoring");
                }
                Err(e) => break Err(TransportError::Frame(e)),
            }
        };

        // The writer ends once every call task has dropped its sender.
        drop(reply_tx);
        let _ = writer.await;
        result
    }

    fn spawn_call(
        &self,
        id: u64,
        service: String,
        method: String,
        payload: Vec<u8>,
        reply_tx: mpsc::Sender<Frame>,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let workers = Arc::clone(&self.workers);
        self.tracker.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            let result = match pw_protocol::frame::decode_payload(&payload) {
                Ok(params) => dispatcher.dispatch(&service, &method, params).await,
                Err(e) => Err(pw_protocol::Fault::invalid_params(e)),
            };
            match Frame::reply(id, result) {
                Ok(frame) => {
                    let _ = reply_tx.send(frame).await;
                }
                Err(e) => {
                    tracing::error!(id, service = %service, method = %method, error = %e, "failed to build reply");
                }
            }
        });
    }
}
