//! Capability composition model.
//!
//! Each capability is a *value* implementing [`Capability`], not a type in
//! an inheritance hierarchy or a mixin. A concrete client aggregates
//! `Vec<Arc<dyn Capability>>`; the [`crate::registry::CapabilityRegistry`]
//! walks that vector to build the merged client-capabilities document and
//! the server-to-client dispatch table.

use async_trait::async_trait;
use lsp_types::{ClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;
use serde_json::Value;
use std::sync::Arc;

use crate::registry::DispatchTableBuilder;

/// A server-to-client request handler. At most one may be registered per
/// method.
#[async_trait]
pub trait ServerRequestHandler: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value>;
}

/// A server-to-client notification handler. Many may be registered per
/// method; each is invoked on its own task.
#[async_trait]
pub trait ServerNotificationHandler: Send + Sync {
    async fn handle(&self, params: Value);
}

/// One declared LSP feature: the methods it touches, the client-capability
/// fragment it contributes, the assertion it runs against the negotiated
/// server capabilities, and (for capabilities that receive server-to-client
/// traffic) the dispatch hooks it registers.
pub trait Capability: Send + Sync {
    /// LSP method name(s) this capability is concerned with, for
    /// diagnostics only (the registry does not use this for routing).
    fn methods(&self) -> &'static [&'static str];

    /// Mutate the draft client-capabilities document.
    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder);

    /// Assert the server advertises what this capability needs. An `Err`
    /// here is fatal to the whole client.
    fn check_server_capabilities(&self, caps: &ServerCapabilities, info: Option<&ServerInfo>) -> Result<()>;

    /// Register handlers for server-originated messages. Most capabilities
    /// (pure outbound requests) have nothing to register here.
    fn register_handlers(&self, _registry: &mut DispatchTableBuilder) {}
}

/// Accumulates client-capability fragments from every composed capability
/// by deep-merging their JSON representations. Using `serde_json::Value`
/// as the merge substrate avoids writing
/// bespoke field-by-field merge code for every nested struct in
/// `lsp_types::ClientCapabilities`.
#[derive(Default)]
pub struct ClientCapabilitiesBuilder {
    value: Value,
}

impl ClientCapabilitiesBuilder {
    pub fn new() -> Self {
        Self { value: Value::Object(Default::default()) }
    }

    /// Merge `fragment` on top of what has been contributed so far.
    /// Capabilities are merged in composition order, so a later capability
    /// in the `Vec` wins field collisions — see [`crate::registry::CapabilityRegistry`]
    /// for the documented, deterministic order.
    pub fn merge_fragment(&mut self, fragment: Value) {
        let base = std::mem::replace(&mut self.value, Value::Null);
        self.value = deep_merge(base, fragment);
    }

    pub fn merge<T: serde::Serialize>(&mut self, path: &[&str], value: T) {
        let mut fragment = serde_json::to_value(value).unwrap_or(Value::Null);
        for segment in path.iter().rev() {
            fragment = serde_json::json!({ *segment: fragment });
        }
        self.merge_fragment(fragment);
    }

    pub fn build(self) -> ClientCapabilities {
        serde_json::from_value(self.value).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Value {
        self.value.clone()
    }
}

fn deep_merge(base: Value, update: Value) -> Value {
    match (base, update) {
        (Value::Object(mut base_map), Value::Object(update_map)) => {
            for (key, update_value) in update_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, update_value),
                    None => update_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        // An explicit null on the update side means "nothing to contribute
        // here", not "erase what an earlier capability set" — only an
        // unset base accepts it.
        (base, Value::Null) => base,
        (_, update) => update,
    }
}

pub type CapabilityHandle = Arc<dyn Capability>;
