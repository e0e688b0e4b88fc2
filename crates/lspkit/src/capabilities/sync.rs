//! `textDocument/didOpen|didChange|didClose`: always registered, unlike the
//! other built-ins which are opt-in, but still expressed as a
//! [`Capability`] value so it participates in the same merge and
//! composition machinery.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use crate::registry::DispatchTableBuilder;
use lsp_types::{ServerCapabilities, ServerInfo, TextDocumentSyncClientCapabilities};
use lspkit_core::Result;

pub struct TextDocumentSyncCapability;

impl Capability for TextDocumentSyncCapability {
    fn methods(&self) -> &'static [&'static str] {
        &[
            "textDocument/didOpen",
            "textDocument/didChange",
            "textDocument/didClose",
        ]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "synchronization"],
            TextDocumentSyncClientCapabilities {
                dynamic_registration: Some(false),
                will_save: Some(false),
                will_save_wait_until: Some(false),
                did_save: Some(false),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.text_document_sync.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument sync support".into(),
            ));
        }
        Ok(())
    }

    fn register_handlers(&self, _registry: &mut DispatchTableBuilder) {}
}
