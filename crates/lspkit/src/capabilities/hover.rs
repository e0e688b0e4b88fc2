//! `textDocument/hover`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{HoverClientCapabilities, MarkupKind, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct HoverCapability;

impl Capability for HoverCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/hover"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "hover"],
            HoverClientCapabilities {
                dynamic_registration: Some(false),
                content_format: Some(vec![MarkupKind::Markdown, MarkupKind::PlainText]),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.hover_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/hover".into(),
            ));
        }
        Ok(())
    }
}
