//! Shared scaffolding for end-to-end tests: a one-shot [`ServerRuntime`]
//! backed by a `tokio::io::duplex` pair, with the other half handed to a
//! fake-server task the test drives directly.

use async_trait::async_trait;
use lspkit::supervisor::{FallbackChain, RunningServer, ServerRuntime};
use lspkit::{ClientOptions, ClientOptionsBuilder};
use lspkit_core::Result;
use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

/// Hands out exactly one `RunningServer` wrapping the client side of a
/// duplex pair; a second `spawn()` call fails, which is the correct
/// behavior for a fallback chain candidate that only ever backs one
/// connection.
struct OnceRuntime(parking_lot::Mutex<Option<RunningServer>>);

#[async_trait]
impl ServerRuntime for OnceRuntime {
    fn name(&self) -> String {
        "test:once".into()
    }

    async fn spawn(&self) -> Result<RunningServer> {
        self.0
            .lock()
            .take()
            .ok_or_else(|| lspkit_core::Error::ServerRuntime("test runtime already consumed".into()))
    }
}

pub type ServerReader = ReadHalf<tokio::io::DuplexStream>;
pub type ServerWriter = WriteHalf<tokio::io::DuplexStream>;

/// Build a [`FallbackChain`] whose only candidate hands back the client
/// side of a fresh duplex pair, and return the server side for the test to
/// drive as a fake LSP server.
pub fn fake_server_chain() -> (FallbackChain, ServerReader, ServerWriter) {
    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    let (client_r, client_w) = split(client_io);
    let (server_r, server_w) = split(server_io);
    let running = RunningServer::from_socket(client_r, client_w);
    let chain = FallbackChain::new(vec![Box::new(OnceRuntime(parking_lot::Mutex::new(Some(running))))]);
    (chain, server_r, server_w)
}

pub fn options_with_chain(chain: FallbackChain) -> ClientOptionsBuilder {
    ClientOptionsBuilder::new(chain).request_timeout(std::time::Duration::from_secs(5))
}

#[allow(dead_code)]
pub fn assert_send_sync<T: Send + Sync>() {}

/// Drive the standard handshake on the server side: read `initialize`,
/// reply with `server_caps`, then read and drop the `initialized`
/// notification. Leaves the connection open afterward for further
/// exchanges.
pub async fn answer_handshake(
    reader: &mut lspkit::codec::FrameReader<impl AsyncRead + Unpin + Send>,
    writer: &mut lspkit::codec::FrameWriter<impl AsyncWrite + Unpin + Send>,
    server_caps: serde_json::Value,
) {
    use lspkit::message::Message;
    match reader.read_message().await {
        Ok(Message::Request(req)) => {
            let result = serde_json::json!({
                "capabilities": server_caps,
                "serverInfo": {"name": "fake-server", "version": "0.0.0"},
            });
            writer.write_message(&Message::success(req.id, result)).await.unwrap();
        }
        other => panic!("expected initialize, got {other:?}"),
    }
    match reader.read_message().await {
        Ok(Message::Notification(n)) if n.method == "initialized" => {}
        other => panic!("expected initialized, got {other:?}"),
    }
}

/// Answer a `shutdown` request with a null result, then an `exit`
/// notification with nothing further expected.
pub async fn answer_shutdown(
    reader: &mut lspkit::codec::FrameReader<impl AsyncRead + Unpin + Send>,
    writer: &mut lspkit::codec::FrameWriter<impl AsyncWrite + Unpin + Send>,
) {
    use lspkit::message::Message;
    match reader.read_message().await {
        Ok(Message::Request(req)) => {
            writer.write_message(&Message::success(req.id, serde_json::json!(null))).await.unwrap();
        }
        other => panic!("expected shutdown, got {other:?}"),
    }
    match reader.read_message().await {
        Ok(Message::Notification(n)) if n.method == "exit" => {}
        other => panic!("expected exit, got {other:?}"),
    }
}
