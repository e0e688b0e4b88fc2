//! `textDocument/documentSymbol`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{DocumentSymbolClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct DocumentSymbolCapability;

impl Capability for DocumentSymbolCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/documentSymbol"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "documentSymbol"],
            DocumentSymbolClientCapabilities {
                dynamic_registration: Some(false),
                hierarchical_document_symbol_support: Some(true),
                ..Default::default()
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.document_symbol_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/documentSymbol".into(),
            ));
        }
        Ok(())
    }
}
