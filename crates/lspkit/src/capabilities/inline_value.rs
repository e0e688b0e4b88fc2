//! `textDocument/inlineValue`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{InlineValueClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct InlineValueCapability;

impl Capability for InlineValueCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/inlineValue"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "inlineValue"],
            InlineValueClientCapabilities {
                dynamic_registration: Some(true),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.inline_value_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/inlineValue".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributes_under_inline_value_path() {
        let mut builder = ClientCapabilitiesBuilder::new();
        InlineValueCapability.contribute_client_capabilities(&mut builder);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot["textDocument"]["inlineValue"]["dynamicRegistration"], true);
    }
}
