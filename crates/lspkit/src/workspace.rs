//! Open-file bookkeeping: `textDocument/didOpen` and `textDocument/didClose`
//! are emitted on the 0→1 and 1→0 transitions of a per-URI open count, not
//! once per caller. Multiple callers holding a buffer open concurrently
//! share one `didOpen`/`didClose` pair.

use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, TextDocumentContentChangeEvent,
    TextDocumentIdentifier, TextDocumentItem, Url, VersionedTextDocumentIdentifier, WorkspaceFolder as LspWorkspaceFolder,
};
use lspkit_core::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::transport::Transport;

/// A workspace root, mirroring `lsp_types::WorkspaceFolder` but owned by the
/// client rather than deserialized off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFolder {
    pub uri: Url,
    pub name: String,
}

impl From<WorkspaceFolder> for LspWorkspaceFolder {
    fn from(folder: WorkspaceFolder) -> Self {
        LspWorkspaceFolder {
            uri: folder.uri,
            name: folder.name,
        }
    }
}

struct OpenEntry {
    version: i32,
    refcount: usize,
}

/// Refcounted `didOpen`/`didClose` state for every buffer a client has
/// touched, shared between every [`OpenFilesGuard`] for the same transport.
pub struct FileBuffers {
    transport: Arc<Transport>,
    open: parking_lot::Mutex<HashMap<Url, OpenEntry>>,
}

impl FileBuffers {
    pub fn new(transport: Arc<Transport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            open: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Open `uri` for the caller's scope, sending `didOpen` only if no other
    /// caller already has it open. Returns a guard whose `Drop` releases
    /// this caller's share and sends `didClose` on the last release.
    pub fn open(self: &Arc<Self>, uri: Url, language_id: impl Into<String>, text: impl Into<String>) -> Result<OpenFilesGuard> {
        let mut open = self.open.lock();
        match open.get_mut(&uri) {
            Some(entry) => {
                entry.refcount += 1;
            }
            None => {
                let params = DidOpenTextDocumentParams {
                    text_document: TextDocumentItem {
                        uri: uri.clone(),
                        language_id: language_id.into(),
                        version: 0,
                        text: text.into(),
                    },
                };
                self.transport
                    .notify("textDocument/didOpen", serde_json::to_value(params)?)?;
                open.insert(uri.clone(), OpenEntry { version: 0, refcount: 1 });
            }
        }
        Ok(OpenFilesGuard {
            buffers: self.clone(),
            uri,
            released: false,
        })
    }

    /// Send `didChange` with a full-document replacement and bump the
    /// tracked version, so a subsequent `didClose` (or a second `open` of
    /// the same URI) observes the latest text.
    pub fn change_full(&self, uri: &Url, text: impl Into<String>) -> Result<()> {
        let mut open = self.open.lock();
        let entry = open
            .get_mut(uri)
            .ok_or_else(|| lspkit_core::Error::State(format!("didChange on unopened document {uri}")))?;
        entry.version += 1;
        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: entry.version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.into(),
            }],
        };
        self.transport
            .notify("textDocument/didChange", serde_json::to_value(params)?)
    }

    fn release(&self, uri: &Url) {
        let mut open = self.open.lock();
        let Some(entry) = open.get_mut(uri) else {
            return;
        };
        entry.refcount -= 1;
        if entry.refcount == 0 {
            open.remove(uri);
            let params = DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
            };
            if let Ok(value) = serde_json::to_value(params) {
                if let Err(e) = self.transport.notify("textDocument/didClose", value) {
                    tracing::warn!("lspkit: failed to send didClose for {uri}: {e}");
                }
            }
        }
    }

    #[cfg(test)]
    fn refcount(&self, uri: &Url) -> usize {
        self.open.lock().get(uri).map(|e| e.refcount).unwrap_or(0)
    }
}

/// RAII scope for one caller's hold on an open document. Synchronous and
/// non-blocking on drop: `didClose` is enqueued through
/// [`Transport::notify`], never awaited.
pub struct OpenFilesGuard {
    buffers: Arc<FileBuffers>,
    uri: Url,
    released: bool,
}

impl OpenFilesGuard {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Release this hold early rather than waiting for `Drop`.
    pub fn close(mut self) {
        self.released = true;
        self.buffers.release(&self.uri);
    }
}

impl Drop for OpenFilesGuard {
    fn drop(&mut self) {
        if !self.released {
            self.buffers.release(&self.uri);
        }
    }
}
