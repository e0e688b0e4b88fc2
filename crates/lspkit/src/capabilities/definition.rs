//! `textDocument/definition`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{GotoCapability, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct DefinitionCapability;

impl Capability for DefinitionCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/definition"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "definition"],
            GotoCapability {
                dynamic_registration: Some(false),
                link_support: Some(true),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.definition_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/definition".into(),
            ));
        }
        Ok(())
    }
}
