//! End-to-end handshake scenarios driven over an in-memory duplex pair
//! standing in for a server's stdio pipes.

mod common;

use common::{answer_handshake, answer_shutdown, fake_server_chain, options_with_chain};
use lspkit::capabilities::hover::HoverCapability;
use lspkit::capabilities::sync::TextDocumentSyncCapability;
use lspkit::client::{Client, ClientState};
use lspkit::codec::{FrameReader, FrameWriter};
use std::sync::Arc;

#[tokio::test]
async fn connect_reaches_ready_and_shutdown_reaches_exited() {
    let (chain, server_r, server_w) = fake_server_chain();
    let server = tokio::spawn(async move {
        let mut reader = FrameReader::new(server_r);
        let mut writer = FrameWriter::new(server_w);
        answer_handshake(
            &mut reader,
            &mut writer,
            serde_json::json!({"hoverProvider": true, "textDocumentSync": 1}),
        )
        .await;
        answer_shutdown(&mut reader, &mut writer).await;
    });

    let options = options_with_chain(chain)
        .capability(Arc::new(TextDocumentSyncCapability))
        .capability(Arc::new(HoverCapability))
        .build()
        .unwrap();

    let client = Client::connect(options).await.unwrap();
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.server_info().unwrap().name, "fake-server");

    client.shutdown().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn missing_required_server_capability_fails_the_handshake() {
    let (chain, server_r, server_w) = fake_server_chain();
    tokio::spawn(async move {
        let mut reader = FrameReader::new(server_r);
        let mut writer = FrameWriter::new(server_w);
        // Server advertises nothing; HoverCapability requires hoverProvider.
        answer_handshake(&mut reader, &mut writer, serde_json::json!({})).await;
    });

    let options = options_with_chain(chain)
        .capability(Arc::new(HoverCapability))
        .build()
        .unwrap();

    let err = Client::connect(options).await.unwrap_err();
    assert!(matches!(err, lspkit_core::Error::CapabilityAssertion(_)));
}

#[tokio::test]
async fn hover_round_trips_through_a_connected_client() {
    let (chain, server_r, server_w) = fake_server_chain();
    tokio::spawn(async move {
        use lspkit::message::Message;
        let mut reader = FrameReader::new(server_r);
        let mut writer = FrameWriter::new(server_w);
        answer_handshake(&mut reader, &mut writer, serde_json::json!({"hoverProvider": true})).await;
        match reader.read_message().await {
            Ok(Message::Request(req)) => {
                let result = serde_json::json!({"contents": {"kind": "plaintext", "value": "it's an i32"}});
                writer.write_message(&Message::success(req.id, result)).await.unwrap();
            }
            other => panic!("expected a hover request, got {other:?}"),
        }
        answer_shutdown(&mut reader, &mut writer).await;
    });

    let options = options_with_chain(chain)
        .capability(Arc::new(HoverCapability))
        .build()
        .unwrap();
    let client = Client::connect(options).await.unwrap();

    let uri: lsp_types::Url = "file:///a.rs".parse().unwrap();
    let hover = client
        .hover(uri, lsp_types::Position { line: 0, character: 0 })
        .await
        .unwrap()
        .unwrap();
    match hover.contents {
        lsp_types::HoverContents::Markup(markup) => {
            assert_eq!(markup.value, "it's an i32");
        }
        other => panic!("unexpected hover contents shape: {other:?}"),
    }

    client.shutdown().await.unwrap();
}
