//! Pool-level broadcast and shutdown, exercised against two independently
//! connected fake servers.

mod common;

use common::{answer_handshake, answer_shutdown, fake_server_chain, options_with_chain};
use lspkit::capabilities::sync::TextDocumentSyncCapability;
use lspkit::codec::{FrameReader, FrameWriter};
use lspkit::message::Message;
use lspkit::pool::{BalancePolicy, Pool};
use std::sync::Arc;

async fn fake_replica(
    expect_notification: Option<&'static str>,
) -> (lspkit::ClientOptions, tokio::task::JoinHandle<()>) {
    let (chain, server_r, server_w) = fake_server_chain();
    let server = tokio::spawn(async move {
        let mut reader = FrameReader::new(server_r);
        let mut writer = FrameWriter::new(server_w);
        answer_handshake(&mut reader, &mut writer, serde_json::json!({"textDocumentSync": 1})).await;
        if let Some(expected) = expect_notification {
            match reader.read_message().await {
                Ok(Message::Notification(n)) => assert_eq!(n.method, expected),
                other => panic!("expected a {expected} notification, got {other:?}"),
            }
        }
        answer_shutdown(&mut reader, &mut writer).await;
    });
    let options = options_with_chain(chain)
        .capability(Arc::new(TextDocumentSyncCapability))
        .build()
        .unwrap();
    (options, server)
}

#[tokio::test]
async fn round_robin_visits_every_replica_before_repeating() {
    let (opts_a, server_a) = fake_replica(None).await;
    let (opts_b, server_b) = fake_replica(None).await;

    let pool = Pool::connect(vec![opts_a, opts_b], BalancePolicy::RoundRobin).await.unwrap();
    assert_eq!(pool.replica_count(), 2);

    let first = Arc::as_ptr(&pool.pick());
    let second = Arc::as_ptr(&pool.pick());
    let third = Arc::as_ptr(&pool.pick());
    assert_ne!(first, second);
    assert_eq!(first, third);

    pool.shutdown().await.unwrap();
    server_a.await.unwrap();
    server_b.await.unwrap();
}

#[tokio::test]
async fn did_change_configuration_broadcasts_to_every_replica() {
    let (opts_a, server_a) = fake_replica(Some("workspace/didChangeConfiguration")).await;
    let (opts_b, server_b) = fake_replica(Some("workspace/didChangeConfiguration")).await;

    let pool = Pool::connect(vec![opts_a, opts_b], BalancePolicy::Random).await.unwrap();
    pool.did_change_configuration(serde_json::json!({"rust": {"checkOnSave": true}}))
        .await
        .unwrap();

    pool.shutdown().await.unwrap();
    server_a.await.unwrap();
    server_b.await.unwrap();
}
