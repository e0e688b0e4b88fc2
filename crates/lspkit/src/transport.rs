//! Transport & Multiplexer: owns the byte stream to one
//! server, drives the read loop, and multiplexes outbound requests against
//! inbound responses, server-originated requests, and notifications.

use crate::channels::{OneShotRx, PendingTable};
use crate::codec::{FrameReader, FrameWriter};
use crate::message::{Message, NotificationMessage, RequestMessage, ResponseMessage, RpcErrorPayload};
use lspkit_core::id::RequestId;
use lspkit_core::{Error, Result};
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

pub type DynReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;
pub type DynWriter = Pin<Box<dyn AsyncWrite + Send + Unpin>>;

/// Bound on the dispatch channel between the read loop and the dispatcher
/// task, providing backpressure against a slow consumer.
pub const DISPATCH_CHANNEL_CAPACITY: usize = 128;

/// An inbound server-originated message, handed to whoever drains
/// [`Transport::dispatch_channel`].
pub enum DispatchItem {
    Request {
        id: RequestId,
        method: String,
        params: Value,
        reply: oneshot::Sender<std::result::Result<Value, RpcErrorPayload>>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

enum Outbound {
    Write(Message),
}

/// Owns one server connection: exactly one writer task, one read loop task,
/// the pending-response table, and the dispatch channel to the Facade.
pub struct Transport {
    writer_tx: mpsc::UnboundedSender<Outbound>,
    pending: Arc<PendingTable>,
    failed: Arc<AtomicBool>,
    dispatch_rx: parking_lot::Mutex<Option<mpsc::Receiver<DispatchItem>>>,
    default_timeout: std::time::Duration,
}

impl Transport {
    /// Spawn the writer and read-loop tasks over `reader`/`writer` and
    /// return the handle the Facade drives. `reader`/`writer` are whatever
    /// the Server Supervisor's chosen runtime produced (stdio pipes,
    /// container-attached stdio, or a socket split in two).
    pub fn spawn(reader: DynReader, writer: DynWriter, default_timeout: std::time::Duration) -> Arc<Self> {
        let pending = Arc::new(PendingTable::new());
        let failed = Arc::new(AtomicBool::new(false));
        let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Outbound>();
        let (dispatch_tx, dispatch_rx) = mpsc::channel(DISPATCH_CHANNEL_CAPACITY);

        tokio::spawn(Self::writer_loop(writer, writer_rx));
        tokio::spawn(Self::read_loop(
            reader,
            pending.clone(),
            dispatch_tx,
            failed.clone(),
            writer_tx.clone(),
        ));

        Arc::new(Self {
            writer_tx,
            pending,
            failed,
            dispatch_rx: parking_lot::Mutex::new(Some(dispatch_rx)),
            default_timeout,
        })
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Take the dispatch channel; may only be called once (the dispatcher
    /// task owns the receiver for the lifetime of the client).
    pub fn dispatch_channel(&self) -> Option<mpsc::Receiver<DispatchItem>> {
        self.dispatch_rx.lock().take()
    }

    /// Fire-and-forget: enqueue a notification for the writer task.
    pub fn notify(&self, method: impl Into<String>, params: Value) -> Result<()> {
        self.send_message(Message::notification(method, params))
    }

    fn send_message(&self, message: Message) -> Result<()> {
        if self.is_failed() {
            return Err(Error::TransportClosed("transport already failed".into()));
        }
        self.writer_tx
            .send(Outbound::Write(message))
            .map_err(|_| Error::TransportClosed("writer task is gone".into()))
    }

    /// Register `id`, write the request, and await its response (or
    /// cancellation/timeout). `id` is released from the pending table
    /// either way.
    pub async fn request_with_id(&self, id: RequestId, method: impl Into<String>, params: Value) -> Result<Value> {
        let rx = self.register_one(id.clone())?;
        if let Err(e) = self.send_message(Message::request(id.clone(), method, params)) {
            self.pending.release(&id);
            return Err(e);
        }
        match tokio::time::timeout(self.default_timeout, rx.recv()).await {
            Ok(result) => result,
            Err(_) => {
                self.pending.release(&id);
                Err(Error::Timeout(self.default_timeout))
            }
        }
    }

    pub async fn request(&self, method: impl Into<String>, params: Value) -> Result<Value> {
        self.request_with_id(RequestId::new(), method, params).await
    }

    fn register_one(&self, id: RequestId) -> Result<OneShotRx> {
        self.pending.register_one(id)
    }

    /// Write a reply to a server-originated request (used by the
    /// dispatcher once a handler has produced a result).
    pub fn respond(&self, id: RequestId, payload: std::result::Result<Value, RpcErrorPayload>) -> Result<()> {
        self.send_message(Message::Response(ResponseMessage { id, payload }))
    }

    async fn writer_loop(writer: DynWriter, mut rx: mpsc::UnboundedReceiver<Outbound>) {
        let mut framer = FrameWriter::new(writer);
        while let Some(Outbound::Write(message)) = rx.recv().await {
            if let Err(e) = framer.write_message(&message).await {
                tracing::warn!("lspkit transport write failed: {e}");
                break;
            }
        }
    }

    async fn read_loop(
        reader: DynReader,
        pending: Arc<PendingTable>,
        dispatch_tx: mpsc::Sender<DispatchItem>,
        failed: Arc<AtomicBool>,
        writer_tx: mpsc::UnboundedSender<Outbound>,
    ) {
        let mut framer = FrameReader::new(reader);
        loop {
            match framer.read_message().await {
                Ok(Message::Response(ResponseMessage { id, payload })) => {
                    let value = payload.map_err(RpcErrorPayload::into_error);
                    if !pending.complete(&id, value) {
                        tracing::warn!("lspkit: response for unknown request id {id}, dropping");
                    }
                }
                Ok(Message::Request(RequestMessage { id, method, params })) => {
                    let (reply_tx, reply_rx) = oneshot::channel();
                    let item = DispatchItem::Request {
                        id: id.clone(),
                        method,
                        params,
                        reply: reply_tx,
                    };
                    if dispatch_tx.send(item).await.is_err() {
                        break;
                    }
                    let writer_tx = writer_tx.clone();
                    tokio::spawn(async move {
                        let payload = reply_rx
                            .await
                            .unwrap_or_else(|_| Err(RpcErrorPayload::method_not_found("<dropped>")));
                        let _ = writer_tx.send(Outbound::Write(Message::Response(ResponseMessage {
                            id,
                            payload,
                        })));
                    });
                }
                Ok(Message::Notification(NotificationMessage { method, params })) => {
                    if dispatch_tx
                        .send(DispatchItem::Notification { method, params })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("lspkit transport read loop terminating: {e}");
                    break;
                }
            }
        }
        failed.store(true, Ordering::SeqCst);
        pending.drain_with_error(|| Error::TransportClosed("transport read loop ended".into()));
    }
}
