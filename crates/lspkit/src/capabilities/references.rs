//! `textDocument/references`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{DynamicRegistrationClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct ReferencesCapability;

impl Capability for ReferencesCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/references"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "references"],
            DynamicRegistrationClientCapabilities {
                dynamic_registration: Some(false),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.references_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/references".into(),
            ));
        }
        Ok(())
    }
}
