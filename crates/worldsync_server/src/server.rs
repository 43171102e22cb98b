//! The framed TCP sync server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::RequestHandler;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use worldsync_protocol::{decode_frame, encode_frame, ErrorResponse, Message};
use worldsync_store::CommitStore;

/// The sync server.
///
/// Accepts framed connections from loopback peers and dispatches each
/// decoded message through a [`RequestHandler`]. Each connection runs on
/// its own task; store writes serialize inside the store itself.
pub struct SyncServer {
    config: ServerConfig,
    handler: Arc<RequestHandler>,
}

impl SyncServer {
    /// Creates a sync server over an injected store.
    pub fn new(config: ServerConfig, store: Arc<CommitStore>) -> Self {
        Self {
            config,
            handler: Arc::new(RequestHandler::new(store)),
        }
    }

    /// Binds the configured address and serves until the process exits.
    pub async fn run(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.tcp_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        tracing::info!(addr = %listener.local_addr()?, "sync server listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            if !trusted(&peer) {
                tracing::warn!(%peer, "closed non-loopback connection");
                drop(stream);
                continue;
            }

            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, handler).await {
                    tracing::debug!(%peer, error = %err, "connection ended");
                }
            });
        }
    }
}

/// Only loopback peers may talk to the sync endpoint.
fn trusted(peer: &SocketAddr) -> bool {
    peer.ip().is_loopback()
}

async fn handle_connection(
    mut stream: TcpStream,
    handler: Arc<RequestHandler>,
) -> ServerResult<()> {
    let mut buf = BytesMut::with_capacity(8 * 1024);

    loop {
        loop {
            match decode_frame(&mut buf) {
                Ok(Some(message)) => {
                    let response = handler.handle_message(message);
                    write_message(&mut stream, &response).await?;
                }
                Ok(None) => break,
                Err(err) if err.is_recoverable() => {
                    // The bad frame was consumed; answer and keep reading.
                    tracing::warn!(error = %err, "protocol error");
                    let response = Message::ErrorResponse(ErrorResponse::new(err.to_string()));
                    write_message(&mut stream, &response).await?;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "unrecoverable decode failure");
                    return Err(err.into());
                }
            }
        }

        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}

async fn write_message(stream: &mut TcpStream, message: &Message) -> ServerResult<()> {
    let mut out = BytesMut::new();
    encode_frame(message, &mut out)?;
    stream.write_all(&out).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use worldsync_protocol::{Commit, HistoryRequest, PullRequest};

    #[test]
    fn loopback_addresses_are_trusted() {
        assert!(trusted(&"127.0.0.1:50000".parse().unwrap()));
        assert!(trusted(&"[::1]:50000".parse().unwrap()));
        assert!(!trusted(&"192.168.1.20:50000".parse().unwrap()));
        assert!(!trusted(&"[2001:db8::1]:50000".parse().unwrap()));
    }

    async fn spawn_server(store: Arc<CommitStore>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = SyncServer::new(ServerConfig::default(), store);
        tokio::spawn(server.serve(listener));
        addr
    }

    async fn roundtrip(stream: &mut TcpStream, request: Message) -> Message {
        let mut out = BytesMut::new();
        encode_frame(&request, &mut out).unwrap();
        stream.write_all(&out).await.unwrap();
        read_message(stream).await
    }

    async fn read_message(stream: &mut TcpStream) -> Message {
        let mut buf = BytesMut::new();
        loop {
            if let Some(message) = decode_frame(&mut buf).unwrap() {
                return message;
            }
            let n = stream.read_buf(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before a full frame arrived");
        }
    }

    fn make_commit(id: &str, timestamp: i64) -> Commit {
        Commit {
            id: id.into(),
            branch: "main".into(),
            parent: None,
            timestamp,
            author: "steve".into(),
            message: "pushed".into(),
        }
    }

    #[tokio::test]
    async fn serves_pull_over_tcp() {
        let store = Arc::new(CommitStore::open_in_memory().unwrap());
        store
            .save_commit(&make_commit("c1", 100), b"zipbytes")
            .unwrap();
        let addr = spawn_server(Arc::clone(&store)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let response = roundtrip(
            &mut stream,
            Message::PullRequest(PullRequest::new("main", None)),
        )
        .await;

        match response {
            Message::PullResponse(resp) => {
                assert_eq!(resp.new_commit_id.as_deref(), Some("c1"));
                assert_eq!(resp.snapshot.as_deref(), Some(&b"zipbytes"[..]));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn serves_history_and_survives_bad_frames() {
        let store = Arc::new(CommitStore::open_in_memory().unwrap());
        store.save_commit(&make_commit("c1", 100), b"").unwrap();
        let addr = spawn_server(store).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();

        // A frame with an unknown discriminator draws an error response
        // but leaves the connection usable.
        let payload = br#"{"type":"HANDSHAKE"}"#;
        let mut out = BytesMut::new();
        out.put_u32(payload.len() as u32);
        out.put_slice(payload);
        stream.write_all(&out).await.unwrap();
        assert!(matches!(
            read_message(&mut stream).await,
            Message::ErrorResponse(_)
        ));

        let response = roundtrip(
            &mut stream,
            Message::HistoryRequest(HistoryRequest::new("main", 10)),
        )
        .await;
        match response {
            Message::HistoryResponse(resp) => assert_eq!(resp.commits.len(), 1),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unexpected_message_gets_error_response() {
        let store = Arc::new(CommitStore::open_in_memory().unwrap());
        let addr = spawn_server(store).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let response = roundtrip(
            &mut stream,
            Message::ErrorResponse(ErrorResponse::new("client should not send this")),
        )
        .await;
        assert!(matches!(response, Message::ErrorResponse(_)));
    }
}
