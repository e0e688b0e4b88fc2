//! `textDocument/prepareCallHierarchy`, `callHierarchy/incomingCalls`, and
//! `callHierarchy/outgoingCalls`. A two-step protocol: the client first
//! resolves a position to one or more `CallHierarchyItem`s, then asks for
//! their callers or callees.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{CallHierarchyClientCapabilities, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct CallHierarchyCapability;

impl Capability for CallHierarchyCapability {
    fn methods(&self) -> &'static [&'static str] {
        &[
            "textDocument/prepareCallHierarchy",
            "callHierarchy/incomingCalls",
            "callHierarchy/outgoingCalls",
        ]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "callHierarchy"],
            CallHierarchyClientCapabilities {
                dynamic_registration: Some(false),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.call_hierarchy_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise call hierarchy support".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributes_under_call_hierarchy_path() {
        let mut builder = ClientCapabilitiesBuilder::new();
        CallHierarchyCapability.contribute_client_capabilities(&mut builder);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot["textDocument"]["callHierarchy"]["dynamicRegistration"], false);
    }
}
