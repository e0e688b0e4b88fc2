//! Open-file refcounting exercised through a connected [`Client`] rather
//! than directly against [`lspkit::FileBuffers`].

mod common;

use common::{answer_handshake, answer_shutdown, fake_server_chain, options_with_chain};
use lspkit::capabilities::sync::TextDocumentSyncCapability;
use lspkit::client::Client;
use lspkit::codec::{FrameReader, FrameWriter};
use lspkit::message::Message;
use std::sync::Arc;

#[tokio::test]
async fn two_callers_opening_the_same_uri_share_one_did_open_and_did_close() {
    let (chain, server_r, server_w) = fake_server_chain();
    let server = tokio::spawn(async move {
        let mut reader = FrameReader::new(server_r);
        let mut writer = FrameWriter::new(server_w);
        answer_handshake(&mut reader, &mut writer, serde_json::json!({"textDocumentSync": 1})).await;

        let mut methods = Vec::new();
        for _ in 0..2 {
            match reader.read_message().await {
                Ok(Message::Notification(n)) => methods.push(n.method),
                other => panic!("expected a notification, got {other:?}"),
            }
        }
        answer_shutdown(&mut reader, &mut writer).await;
        methods
    });

    let options = options_with_chain(chain)
        .capability(Arc::new(TextDocumentSyncCapability))
        .build()
        .unwrap();
    let client = Client::connect(options).await.unwrap();

    let uri: lsp_types::Url = "file:///shared.rs".parse().unwrap();
    let buffers = client.open_files().clone();
    let a = buffers.open(uri.clone(), "rust", "fn a() {}").unwrap();
    let b = buffers.open(uri.clone(), "rust", "fn a() {}").unwrap();

    a.close();
    drop(b);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    client.shutdown().await.unwrap();
    let methods = server.await.unwrap();
    assert_eq!(methods, vec!["textDocument/didOpen", "textDocument/didClose"]);
}
