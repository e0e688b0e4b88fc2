//! `window/logMessage`, `window/showMessage` (inbound notifications), and
//! `window/showMessageRequest`, `window/showDocument` (inbound requests).
//! None of these have a corresponding client-capabilities fragment to
//! contribute or a server-capability flag to assert: a server is always
//! free to talk to the user.

use crate::capability::{Capability, ClientCapabilitiesBuilder, ServerNotificationHandler, ServerRequestHandler};
use crate::registry::DispatchTableBuilder;
use async_trait::async_trait;
use lsp_types::{
    LogMessageParams, MessageType, ServerCapabilities, ServerInfo, ShowDocumentClientCapabilities, ShowDocumentParams,
    ShowDocumentResult, ShowMessageParams, ShowMessageRequestClientCapabilities, ShowMessageRequestParams,
};
use lspkit_core::logger::{LogLevel, Logger};
use lspkit_core::Result;
use serde_json::Value;
use std::sync::Arc;

fn to_log_level(message_type: MessageType) -> LogLevel {
    if message_type == MessageType::ERROR {
        LogLevel::Error
    } else if message_type == MessageType::WARNING {
        LogLevel::Warning
    } else if message_type == MessageType::INFO {
        LogLevel::Info
    } else {
        LogLevel::Log
    }
}

struct LogMessageHandler {
    logger: Arc<dyn Logger>,
}

#[async_trait]
impl ServerNotificationHandler for LogMessageHandler {
    async fn handle(&self, params: Value) {
        match serde_json::from_value::<LogMessageParams>(params) {
            Ok(params) => self.logger.log(to_log_level(params.typ), &params.message),
            Err(e) => tracing::warn!("lspkit: malformed logMessage params: {e}"),
        }
    }
}

struct ShowMessageHandler {
    logger: Arc<dyn Logger>,
}

#[async_trait]
impl ServerNotificationHandler for ShowMessageHandler {
    async fn handle(&self, params: Value) {
        match serde_json::from_value::<ShowMessageParams>(params) {
            Ok(params) => self.logger.log(to_log_level(params.typ), &params.message),
            Err(e) => tracing::warn!("lspkit: malformed showMessage params: {e}"),
        }
    }
}

/// `window/logMessage` and `window/showMessage`: both forward to the same
/// [`Logger`] seam, distinguished only by how loudly a user-facing client
/// would normally present them.
pub struct WindowMessageCapability {
    logger: Arc<dyn Logger>,
}

impl WindowMessageCapability {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Capability for WindowMessageCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["window/logMessage", "window/showMessage"]
    }

    fn contribute_client_capabilities(&self, _builder: &mut ClientCapabilitiesBuilder) {}

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, registry: &mut DispatchTableBuilder) {
        registry.register_notification(
            "window/logMessage",
            Arc::new(LogMessageHandler {
                logger: self.logger.clone(),
            }),
        );
        registry.register_notification(
            "window/showMessage",
            Arc::new(ShowMessageHandler {
                logger: self.logger.clone(),
            }),
        );
    }
}

struct ShowMessageRequestHandler {
    logger: Arc<dyn Logger>,
}

#[async_trait]
impl ServerRequestHandler for ShowMessageRequestHandler {
    async fn handle(&self, params: Value) -> Result<Value> {
        let params: ShowMessageRequestParams = serde_json::from_value(params)?;
        self.logger.log(to_log_level(params.typ), &params.message);
        // No UI to present actions through; report that nothing was picked.
        Ok(serde_json::json!(null))
    }
}

struct ShowDocumentHandler;

#[async_trait]
impl ServerRequestHandler for ShowDocumentHandler {
    async fn handle(&self, params: Value) -> Result<Value> {
        let _params: ShowDocumentParams = serde_json::from_value(params)?;
        let result = ShowDocumentResult { success: false };
        Ok(serde_json::to_value(result)?)
    }
}

/// `window/showMessageRequest` and `window/showDocument`: both require a
/// reply, but a headless client has no UI to drive them through, so each
/// answers with the "declined" shape the protocol defines for that case.
pub struct WindowRequestCapability {
    logger: Arc<dyn Logger>,
}

impl WindowRequestCapability {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Capability for WindowRequestCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["window/showMessageRequest", "window/showDocument"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["window", "showMessage"],
            ShowMessageRequestClientCapabilities {
                message_action_item: None,
            },
        );
        builder.merge(
            &["window", "showDocument"],
            ShowDocumentClientCapabilities { support: true },
        );
    }

    fn check_server_capabilities(&self, _caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        Ok(())
    }

    fn register_handlers(&self, registry: &mut DispatchTableBuilder) {
        registry.register_request(
            "window/showMessageRequest",
            Arc::new(ShowMessageRequestHandler {
                logger: self.logger.clone(),
            }),
        );
        registry.register_request("window/showDocument", Arc::new(ShowDocumentHandler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lspkit_core::logger::NoopLogger;

    #[tokio::test]
    async fn log_message_forwards_without_erroring() {
        let handler = LogMessageHandler {
            logger: Arc::new(NoopLogger),
        };
        handler
            .handle(serde_json::json!({ "type": 3, "message": "indexing workspace" }))
            .await;
    }

    #[tokio::test]
    async fn show_document_declines_when_there_is_no_ui() {
        let handler = ShowDocumentHandler;
        let result = handler
            .handle(serde_json::json!({ "uri": "file:///a.rs" }))
            .await
            .unwrap();
        assert_eq!(result["success"], false);
    }
}
