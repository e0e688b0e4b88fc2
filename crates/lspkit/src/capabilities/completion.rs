//! `textDocument/completion`.

use crate::capability::{Capability, ClientCapabilitiesBuilder};
use lsp_types::{CompletionClientCapabilities, CompletionItemCapability, MarkupKind, ServerCapabilities, ServerInfo};
use lspkit_core::Result;

pub struct CompletionCapability;

impl Capability for CompletionCapability {
    fn methods(&self) -> &'static [&'static str] {
        &["textDocument/completion"]
    }

    fn contribute_client_capabilities(&self, builder: &mut ClientCapabilitiesBuilder) {
        builder.merge(
            &["textDocument", "completion"],
            CompletionClientCapabilities {
                dynamic_registration: Some(false),
                completion_item: Some(CompletionItemCapability {
                    snippet_support: Some(false),
                    commit_characters_support: Some(false),
                    documentation_format: Some(vec![MarkupKind::Markdown, MarkupKind::PlainText]),
                    deprecated_support: Some(true),
                    preselect_support: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
    }

    fn check_server_capabilities(&self, caps: &ServerCapabilities, _info: Option<&ServerInfo>) -> Result<()> {
        if caps.completion_provider.is_none() {
            return Err(lspkit_core::Error::CapabilityAssertion(
                "server does not advertise textDocument/completion".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributes_under_the_camel_case_completion_path() {
        let mut builder = ClientCapabilitiesBuilder::new();
        CompletionCapability.contribute_client_capabilities(&mut builder);
        let snapshot = builder.snapshot();
        assert_eq!(
            snapshot["textDocument"]["completion"]["completionItem"]["snippetSupport"],
            false
        );
    }
}
