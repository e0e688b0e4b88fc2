//! `workspace/configuration` and `workspace/workspaceFolders`: the server
//! asks, the client answers out of state it already holds. Neither has a
//! server-capability flag; a server either sends the request or it doesn't.

use crate::capability::{Capability, ClientCapabilitiesBuilder, ServerRequestHandler};
use crate::registry::DispatchTableBuilder;
use async_trait::async_trait;
use lsp_types::{ConfigurationParams, ServerCapabilities, ServerInfo, WorkspaceFolder};
use lspkit_core::Result;
use serde_json::Value;
use std::sync::Arc;

/// Supplies the client's answer to `workspace/configuration`: one JSON
/// value per requested [`lsp_types::ConfigurationItem`], in request order.
pub trait ConfigurationProvider: Send + Sync {
    fn configuration(&self, params: &ConfigurationParams) -> Vec<Value>;
}

/// Falls back to `null` for every requested item, the safe default when a
/// client has no notion of per-section configuration.
pub struct NullConfigurationProvider;

impl ConfigurationProvider for NullConfigurationProvider {
    fn configuration(&self, params: &ConfigurationParams) -> Vec<Value> {
        vec![Value::Null; params.items.len()]
    }
}

struct ConfigurationHandler {
    provider: Arc<dyn ConfigurationProvider>,
}

#[async_trait]
impl ServerRequestHandler for ConfigurationHandler {
    async fn handle(&self, params: Value) -> Result<Value> {
        let params: ConfigurationParams = serde_json::from_value(params)?;
        let values = self.provider.configuration(&params);
        Ok(serde_json::to_value(values)?)
    }
}

pub struct ConfigurationCapability {
    provider: Arc<dyn ConfigurationProvider>,
}

impl ConfigurationCapability {
    pub fn new(provider: Arc<dyn ConfigurationProvider>) -> Self {
        Self { provider }
    }
}

impl Default for ConfigurationCapability {
    fn default() -> Self {
        Self::new(Arc::new(NullConfigurationProvider))
    }
}

impl Capability for ConfigurationCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["workspace/configuration"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(&["workspace", "configuration"], true);
    }

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, registry: &mut DispatchTableBuilder) {
        registry.register_request(
            "workspace/configuration",
            Arc::new(ConfigurationHandler {
                provider: self.provider.clone(),
            }),
        );
    }
}

struct WorkspaceFoldersHandler {
    folders: Vec<WorkspaceFolder>,
}

#[async_trait]
impl ServerRequestHandler for WorkspaceFoldersHandler {
    async fn handle(&self, _params: Value) -> Result<Value> {
        Ok(serde_json::to_value(&self.folders)?)
    }
}

pub struct WorkspaceFoldersCapability {
    folders: Vec<WorkspaceFolder>,
}

impl WorkspaceFoldersCapability {
    pub fn new(folders: Vec<WorkspaceFolder>) -> Self {
        Self { folders }
    }
}

impl Capability for WorkspaceFoldersCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["workspace/workspaceFolders"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(&["workspace", "workspaceFolders"], true);
    }

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, registry: &mut DispatchTableBuilder) {
        registry.register_request(
            "workspace/workspaceFolders",
            Arc::new(WorkspaceFoldersHandler {
                folders: self.folders.clone(),
            }),
        );
    }
}

/// `workspace/didChangeConfiguration`: purely outbound, the client sends it
/// whenever its settings change. Contributes the capability flag; sending
/// the notification itself is `Client::did_change_configuration`.
#[derive(Default)]
pub struct DidChangeConfigurationCapability;

impl Capability for DidChangeConfigurationCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["workspace/didChangeConfiguration"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(&["workspace", "didChangeConfiguration", "dynamicRegistration"], false);
    }

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, _registry: &mut DispatchTableBuilder) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_answers_one_null_per_item() {
        let handler = ConfigurationHandler {
            provider: Arc::new(NullConfigurationProvider),
        };
        let result = handler
            .handle(serde_json::json!({ "items": [{"section": "rust"}, {"section": "editor"}] }))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!([null, null]));
    }

    #[tokio::test]
    async fn workspace_folders_echoes_the_configured_set() {
        let folder = WorkspaceFolder {
            uri: "file:///repo".parse().unwrap(),
            name: "repo".into(),
        };
        let handler = WorkspaceFoldersHandler {
            folders: vec![folder.clone()],
        };
        let result = handler.handle(Value::Null).await.unwrap();
        assert_eq!(result[0]["name"], "repo");
    }
}
