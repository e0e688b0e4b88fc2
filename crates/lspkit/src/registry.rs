//! Capability Registry: merges the composed capabilities'
//! declarations into a single client-capabilities document, a set of
//! server-capability assertions, and a server-to-client dispatch table.

use crate::capability::{
    CapabilityHandle, ClientCapabilitiesBuilder, ServerNotificationHandler, ServerRequestHandler,
};
use crate::message::RpcErrorPayload;
use lsp_types::{ClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Built once per client instance by walking every composed capability's
/// `register_handlers`.
#[derive(Default)]
pub struct DispatchTableBuilder {
    requests: HashMap<&'static str, Arc<dyn ServerRequestHandler>>,
    notifications: HashMap<&'static str, Vec<Arc<dyn ServerNotificationHandler>>>,
}

impl DispatchTableBuilder {
    /// At most one request handler may exist per method; a second
    /// registration overwrites the first and is logged, since composition
    /// is a static, build-time concern rather than a runtime race.
    pub fn register_request(&mut self, method: &'static str, handler: Arc<dyn ServerRequestHandler>) {
        if self.requests.insert(method, handler).is_some() {
            tracing::warn!("lspkit: multiple request handlers registered for {method}, keeping the last one");
        }
    }

    /// Notifications broadcast to every registered handler for the method.
    pub fn register_notification(&mut self, method: &'static str, handler: Arc<dyn ServerNotificationHandler>) {
        self.notifications.entry(method).or_default().push(handler);
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable {
            requests: self.requests,
            notifications: self.notifications,
        }
    }
}

pub struct DispatchTable {
    requests: HashMap<&'static str, Arc<dyn ServerRequestHandler>>,
    notifications: HashMap<&'static str, Vec<Arc<dyn ServerNotificationHandler>>>,
}

impl DispatchTable {
    /// Handle an inbound server request, replying `-32601 Method not found`
    /// for any method with no registered handler.
    pub async fn handle_request(&self, method: &str, params: Value) -> std::result::Result<Value, RpcErrorPayload> {
        match self.requests.get(method) {
            Some(handler) => handler
                .handle(params)
                .await
                .map_err(|e| RpcErrorPayload {
                    code: RpcErrorPayload::INTERNAL_ERROR,
                    message: e.to_string(),
                    data: None,
                }),
            None => Err(RpcErrorPayload::method_not_found(method)),
        }
    }

    /// Handle an inbound notification: dispatch to every registered
    /// handler for the method, or log-and-drop if none are registered.
    pub fn handlers_for_notification(&self, method: &str) -> Vec<Arc<dyn ServerNotificationHandler>> {
        self.notifications.get(method).cloned().unwrap_or_default()
    }

    pub fn has_notification_handler(&self, method: &str) -> bool {
        self.notifications.contains_key(method)
    }
}

/// The negotiated contract for one live client: every capability reachable
/// in its composition, merged into a single document, assertion set, and
/// dispatch table.
pub struct CapabilityRegistry {
    capabilities: Vec<CapabilityHandle>,
}

impl CapabilityRegistry {
    pub fn new(capabilities: Vec<CapabilityHandle>) -> Self {
        Self { capabilities }
    }

    /// Pure function of the composed capability set: merging the same
    /// capabilities in the same order twice yields structurally equal
    /// documents.
    pub fn merged_client_capabilities(&self) -> ClientCapabilities {
        let mut builder = ClientCapabilitiesBuilder::new();
        for capability in &self.capabilities {
            capability.contribute_client_capabilities(&mut builder);
        }
        builder.build()
    }

    pub fn check_server_capabilities(&self, caps: &ServerCapabilities, info: Option<&ServerInfo>) -> Result<()> {
        for capability in &self.capabilities {
            capability.check_server_capabilities(caps, info)?;
        }
        Ok(())
    }

    pub fn build_dispatch_table(&self) -> DispatchTable {
        let mut builder = DispatchTableBuilder::default();
        for capability in &self.capabilities {
            capability.register_handlers(&mut builder);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::sync::TextDocumentSyncCapability;

    #[test]
    fn merged_capabilities_is_pure() {
        let registry = CapabilityRegistry::new(vec![Arc::new(TextDocumentSyncCapability)]);
        let once = serde_json::to_value(registry.merged_client_capabilities()).unwrap();
        let twice = serde_json::to_value(registry.merged_client_capabilities()).unwrap();
        assert_eq!(once, twice);
    }
}
