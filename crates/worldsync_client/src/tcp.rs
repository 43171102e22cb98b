//! Framed TCP transport with per-request correlation.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use worldsync_protocol::{
    decode_frame, encode_frame, HistoryRequest, HistoryResponse, Message, PullRequest,
    PullResponse,
};

/// A waiter registered for the next response on the connection.
struct Waiter {
    token: u64,
    tx: oneshot::Sender<Message>,
}

/// State shared between a request and the connection's read task.
struct Shared {
    pending: Mutex<Option<Waiter>>,
    /// Responses owed to timed-out requests; the read task discards this
    /// many messages before resolving a waiter, so a late response can
    /// never be delivered to a later request.
    stale: AtomicU64,
}

struct Connection {
    writer: OwnedWriteHalf,
    shared: Arc<Shared>,
}

/// Blocking sync transport over a framed TCP connection.
///
/// Connects lazily on the first request and reconnects after a
/// connection-level failure. Each request registers a correlation token
/// resolved through a oneshot channel; the timeout cancels only its own
/// waiter.
pub struct TcpTransport {
    addr: String,
    timeout: Duration,
    runtime: Runtime,
    connection: Mutex<Option<Connection>>,
    next_token: AtomicU64,
}

impl TcpTransport {
    /// Creates a transport for the given `host:port` address.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            addr: addr.into(),
            timeout,
            runtime,
            connection: Mutex::new(None),
            next_token: AtomicU64::new(1),
        })
    }

    fn request(&self, message: Message) -> SyncResult<Message> {
        self.runtime.block_on(self.request_async(message))
    }

    async fn request_async(&self, message: Message) -> SyncResult<Message> {
        let existing = self.connection.lock().take();
        let mut conn = match existing {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        let result = self.exchange(&mut conn, message).await;
        match &result {
            // The connection survives success and timeouts; the read task
            // knows how many stale responses to skip.
            Ok(_) | Err(SyncError::Timeout) => {
                *self.connection.lock() = Some(conn);
            }
            Err(_) => {}
        }
        result
    }

    async fn connect(&self) -> SyncResult<Connection> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|err| SyncError::Transport(format!("connect {}: {err}", self.addr)))?;
        tracing::debug!(addr = %self.addr, "connected to sync server");

        let (reader, writer) = stream.into_split();
        let shared = Arc::new(Shared {
            pending: Mutex::new(None),
            stale: AtomicU64::new(0),
        });
        tokio::spawn(read_loop(reader, Arc::clone(&shared)));

        Ok(Connection { writer, shared })
    }

    async fn exchange(&self, conn: &mut Connection, message: Message) -> SyncResult<Message> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        *conn.shared.pending.lock() = Some(Waiter { token, tx });

        let mut out = BytesMut::new();
        encode_frame(&message, &mut out)?;
        conn.writer
            .write_all(&out)
            .await
            .map_err(|err| SyncError::Transport(format!("write failed: {err}")))?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_closed)) => Err(SyncError::Transport("connection closed by server".into())),
            Err(_elapsed) => {
                let mut pending = conn.shared.pending.lock();
                if pending.as_ref().is_some_and(|waiter| waiter.token == token) {
                    *pending = None;
                    conn.shared.stale.fetch_add(1, Ordering::SeqCst);
                }
                drop(pending);
                Err(SyncError::Timeout)
            }
        }
    }
}

impl SyncTransport for TcpTransport {
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        match self.request(Message::PullRequest(request.clone()))? {
            Message::PullResponse(response) => Ok(response),
            Message::ErrorResponse(err) => Err(SyncError::Server(err.message)),
            other => Err(SyncError::UnexpectedResponse(
                other.message_type().as_str().into(),
            )),
        }
    }

    fn history(&self, request: &HistoryRequest) -> SyncResult<HistoryResponse> {
        match self.request(Message::HistoryRequest(request.clone()))? {
            Message::HistoryResponse(response) => Ok(response),
            Message::ErrorResponse(err) => Err(SyncError::Server(err.message)),
            other => Err(SyncError::UnexpectedResponse(
                other.message_type().as_str().into(),
            )),
        }
    }

    fn close(&self) -> SyncResult<()> {
        *self.connection.lock() = None;
        Ok(())
    }
}

async fn read_loop(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    loop {
        loop {
            match decode_frame(&mut buf) {
                Ok(Some(message)) => dispatch(&shared, message),
                Ok(None) => break,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(error = %err, "dropping undecodable response");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "response stream corrupt");
                    return;
                }
            }
        }
        match reader.read_buf(&mut buf).await {
            Ok(0) => return,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "read failed");
                return;
            }
        }
    }
}

fn dispatch(shared: &Shared, message: Message) {
    if shared.stale.load(Ordering::SeqCst) > 0 {
        shared.stale.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("discarding response to a timed-out request");
        return;
    }
    match shared.pending.lock().take() {
        Some(waiter) => {
            if waiter.tx.send(message).is_err() {
                tracing::debug!("waiter dropped before response delivery");
            }
        }
        None => tracing::debug!("discarding uncorrelated response"),
    }
}
