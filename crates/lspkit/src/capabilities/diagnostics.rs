//! `textDocument/publishDiagnostics`: inbound-only, the server pushes these
//! unprompted and there is no server-capability flag to assert against.

use crate::capability::{Capability, ClientCapabilitiesBuilder, ServerNotificationHandler};
use crate::registry::DispatchTableBuilder;
use async_trait::async_trait;
use dashmap::DashMap;
use lsp_types::{PublishDiagnosticsClientCapabilities, PublishDiagnosticsParams, ServerCapabilities, ServerInfo, Url};
use lspkit_core::Result;
use serde_json::Value;
use std::sync::Arc;

/// Last known diagnostics per document, keyed by URI. The server is the
/// source of truth: every `publishDiagnostics` notification replaces
/// whatever was stored for that URI, including an empty list clearing it.
#[derive(Default)]
pub struct DiagnosticsStore {
    by_uri: DashMap<Url, Vec<lsp_types::Diagnostic>>,
}

impl DiagnosticsStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, uri: &Url) -> Vec<lsp_types::Diagnostic> {
        self.by_uri.get(uri).map(|entry| entry.clone()).unwrap_or_default()
    }

    fn publish(&self, params: PublishDiagnosticsParams) {
        self.by_uri.insert(params.uri, params.diagnostics);
    }
}

struct PublishDiagnosticsHandler {
    store: Arc<DiagnosticsStore>,
}

#[async_trait]
impl ServerNotificationHandler for PublishDiagnosticsHandler {
    async fn handle(&self, params: Value) {
        match serde_json::from_value::<PublishDiagnosticsParams>(params) {
            Ok(params) => self.store.publish(params),
            Err(e) => tracing::warn!("lspkit: malformed publishDiagnostics params: {e}"),
        }
    }
}

pub struct DiagnosticsCapability {
    store: Arc<DiagnosticsStore>,
}

impl DiagnosticsCapability {
    pub fn new(store: Arc<DiagnosticsStore>) -> Self {
        Self { store }
    }
}

impl Capability for DiagnosticsCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/publishDiagnostics"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "publishDiagnostics"],
            PublishDiagnosticsClientCapabilities::default(),
        );
    }

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, registry: &mut DispatchTableBuilder) {
        registry.register_notification(
            "textDocument/publishDiagnostics",
            Arc::new(PublishDiagnosticsHandler {
                store: self.store.clone(),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_replaces_the_previous_set_for_that_uri() {
        let store = DiagnosticsStore::new();
        let handler = PublishDiagnosticsHandler { store: store.clone() };
        let uri: Url = "file:///a.rs".parse().unwrap();

        handler
            .handle(serde_json::json!({
                "uri": uri,
                "diagnostics": [{
                    "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 1}},
                    "message": "unused import",
                }],
            }))
            .await;
        assert_eq!(store.get(&uri).len(), 1);

        handler
            .handle(serde_json::json!({ "uri": uri, "diagnostics": [] }))
            .await;
        assert!(store.get(&uri).is_empty());
    }

    #[tokio::test]
    async fn malformed_params_are_logged_and_dropped_not_fatal() {
        let store = DiagnosticsStore::new();
        let handler = PublishDiagnosticsHandler { store: store.clone() };
        handler.handle(serde_json::json!({ "nonsense": true })).await;
        assert!(store.by_uri.is_empty());
    }
}
