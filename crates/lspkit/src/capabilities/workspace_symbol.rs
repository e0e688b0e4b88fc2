//! `workspace/symbol`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{
    ServerCapabilities, ServerInfo, SymbolKind, SymbolKindCapability, SymbolTag, TagSupport,
    WorkspaceSymbolClientCapabilities, WorkspaceSymbolResolveSupportCapability,
};
use lspkit_core::Result;

pub struct WorkspaceSymbolCapability;

impl Capability for WorkspaceSymbolCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["workspace/symbol"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["workspace", "symbol"],
            WorkspaceSymbolClientCapabilities {
                dynamic_registration: Some(false),
                symbol_kind: Some(SymbolKindCapability {
                    value_set: Some(vec![
                        SymbolKind::FILE,
                        SymbolKind::MODULE,
                        SymbolKind::NAMESPACE,
                        SymbolKind::PACKAGE,
                        SymbolKind::CLASS,
                        SymbolKind::METHOD,
                        SymbolKind::PROPERTY,
                        SymbolKind::FIELD,
                        SymbolKind::CONSTRUCTOR,
                        SymbolKind::ENUM,
                        SymbolKind::INTERFACE,
                        SymbolKind::FUNCTION,
                        SymbolKind::VARIABLE,
                        SymbolKind::CONSTANT,
                        SymbolKind::STRING,
                        SymbolKind::NUMBER,
                        SymbolKind::BOOLEAN,
                        SymbolKind::ARRAY,
                        SymbolKind::OBJECT,
                        SymbolKind::KEY,
                        SymbolKind::NULL,
                        SymbolKind::ENUM_MEMBER,
                        SymbolKind::STRUCT,
                        SymbolKind::EVENT,
                        SymbolKind::OPERATOR,
                        SymbolKind::TYPE_PARAMETER,
                    ]),
                }),
                tag_support: Some(TagSupport {
                    value_set: vec![SymbolTag::DEPRECATED],
                }),
                resolve_support: Some(WorkspaceSymbolResolveSupportCapability {
                    properties: vec!["location.range".into()],
                }),
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.workspace_symbol_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise workspace/symbol".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributes_under_the_camel_case_symbol_path() {
        let mut builder = ClientCapabilitiesBuilder::new();
        WorkspaceSymbolCapability.contribute_client_capabilities(&mut builder);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot["workspace"]["symbol"]["dynamicRegistration"], false);
        assert!(snapshot["workspace"]["symbol"]["symbolKind"]["valueSet"].is_array());
    }
}
