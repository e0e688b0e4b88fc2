//! The client facade: wires the Server Supervisor, the Transport, and the
//! Capability Registry into one handshake, owns the state machine, and
//! exposes the protocol as typed async methods.

use crate::capability::CapabilityHandle;
use crate::registry::CapabilityRegistry;
use crate::supervisor::{FallbackChain, RunningServer};
use crate::transport::{DispatchItem, Transport};
use crate::workspace::FileBuffers;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams, CallHierarchyItem, CallHierarchyOutgoingCall,
    CallHierarchyOutgoingCallsParams, CallHierarchyPrepareParams, ClientInfo, CompletionParams, CompletionResponse,
    DocumentSymbolParams, DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverParams,
    InitializeParams, InitializeResult, InitializedParams, InlineValue, InlineValueContext, InlineValueParams, Position,
    Range, ReferenceContext, ReferenceParams, TextDocumentIdentifier, TextDocumentPositionParams, Url,
    WorkspaceSymbolParams, WorkspaceSymbolResponse,
};
use lspkit_core::logger::{Logger, NoopLogger};
use lspkit_core::{Error, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where in its lifetime a client currently is. `Failed` absorbs every other
/// state: once entered, no further protocol traffic is attempted and every
/// typed method returns [`Error::State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Spawned,
    Ready,
    ShuttingDown,
    Exited,
    Failed,
}

impl ClientState {
    fn as_u8(self) -> u8 {
        match self {
            ClientState::Uninitialized => 0,
            ClientState::Spawned => 1,
            ClientState::Ready => 2,
            ClientState::ShuttingDown => 3,
            ClientState::Exited => 4,
            ClientState::Failed => 5,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ClientState::Uninitialized,
            1 => ClientState::Spawned,
            2 => ClientState::Ready,
            3 => ClientState::ShuttingDown,
            4 => ClientState::Exited,
            _ => ClientState::Failed,
        }
    }
}

struct StateCell(AtomicU8);

impl StateCell {
    fn new(initial: ClientState) -> Self {
        Self(AtomicU8::new(initial.as_u8()))
    }

    fn get(&self) -> ClientState {
        ClientState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: ClientState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

/// Configuration for one client instance, consumed by [`Client::connect`] or
/// [`Client::run`].
pub struct ClientOptions {
    pub runtime: FallbackChain,
    pub capabilities: Vec<CapabilityHandle>,
    pub logger: Arc<dyn Logger>,
    pub client_info: Option<ClientInfo>,
    pub workspace_folders: Vec<crate::workspace::WorkspaceFolder>,
    pub initialization_options: Option<serde_json::Value>,
    pub request_timeout: Duration,
    pub teardown_grace: Duration,
}

pub struct ClientOptionsBuilder {
    runtime: Option<FallbackChain>,
    capabilities: Vec<CapabilityHandle>,
    logger: Arc<dyn Logger>,
    client_info: Option<ClientInfo>,
    workspace_folders: Vec<crate::workspace::WorkspaceFolder>,
    initialization_options: Option<serde_json::Value>,
    request_timeout: Duration,
    teardown_grace: Duration,
}

impl Default for ClientOptionsBuilder {
    fn default() -> Self {
        Self {
            runtime: None,
            capabilities: Vec::new(),
            logger: Arc::new(NoopLogger),
            client_info: None,
            workspace_folders: Vec::new(),
            initialization_options: None,
            request_timeout: Duration::from_secs(30),
            teardown_grace: Duration::from_secs(2),
        }
    }
}

impl ClientOptionsBuilder {
    pub fn new(runtime: FallbackChain) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::default()
        }
    }

    pub fn capability(mut self, capability: CapabilityHandle) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = CapabilityHandle>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn client_info(mut self, name: impl Into<String>, version: Option<String>) -> Self {
        self.client_info = Some(ClientInfo {
            name: name.into(),
            version,
        });
        self
    }

    /// A single-root workspace: one folder named `root`, which also
    /// populates the legacy `root_uri` field during handshake.
    pub fn root_uri(mut self, uri: Url) -> Self {
        self.workspace_folders = vec![crate::workspace::WorkspaceFolder {
            uri,
            name: "root".into(),
        }];
        self
    }

    pub fn workspace_folders(mut self, folders: Vec<crate::workspace::WorkspaceFolder>) -> Self {
        self.workspace_folders = folders;
        self
    }

    pub fn initialization_options(mut self, options: serde_json::Value) -> Self {
        self.initialization_options = Some(options);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Convenience: register the built-in `window/*` capabilities against
    /// whatever logger was configured with [`Self::logger`], so a caller
    /// doesn't have to wire that pair up by hand.
    pub fn with_standard_window_capabilities(mut self) -> Self {
        self.capabilities.push(Arc::new(crate::capabilities::window::WindowMessageCapability::new(
            self.logger.clone(),
        )));
        self.capabilities.push(Arc::new(crate::capabilities::window::WindowRequestCapability::new(
            self.logger.clone(),
        )));
        self
    }

    pub fn build(self) -> Result<ClientOptions> {
        let runtime = self
            .runtime
            .ok_or_else(|| Error::Internal("ClientOptionsBuilder needs a runtime".into()))?;
        Ok(ClientOptions {
            runtime,
            capabilities: self.capabilities,
            logger: self.logger,
            client_info: self.client_info,
            workspace_folders: self.workspace_folders,
            initialization_options: self.initialization_options,
            request_timeout: self.request_timeout,
            teardown_grace: self.teardown_grace,
        })
    }
}

/// A live connection to one language server: transport, negotiated
/// capabilities, and open-file bookkeeping, plus the typed operations built
/// on top of them.
pub struct Client {
    transport: Arc<Transport>,
    buffers: Arc<FileBuffers>,
    server_info: Option<lsp_types::ServerInfo>,
    server_capabilities: lsp_types::ServerCapabilities,
    state: StateCell,
    teardown_grace: Duration,
    running_server: parking_lot::Mutex<Option<RunningServer>>,
    dispatcher: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("state", &self.state.get()).finish_non_exhaustive()
    }
}

impl Client {
    /// Run the eight-step handshake against whatever runtime
    /// `options.runtime` resolves to, then pass the connected client to
    /// `body`. The client is always shut down and torn down afterward,
    /// whether `body` returns `Ok` or `Err`.
    pub async fn run<F, Fut, T>(options: ClientOptions, body: F) -> Result<T>
    where
        F: FnOnce(Arc<Client>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let client = Client::connect(options).await?;
        let result = body(client.clone()).await;
        let shutdown_result = client.shutdown().await;
        match (result, shutdown_result) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), _) => Err(e),
        }
    }

    /// Steps 1-8: spawn a server, connect the transport, negotiate
    /// capabilities, and start the dispatcher. Returns a client in the
    /// `Ready` state, or `Err` with the client left in `Failed`.
    pub async fn connect(options: ClientOptions) -> Result<Arc<Client>> {
        // 1. Spawn via the fallback chain.
        let running = options.runtime.spawn_first_available().await?;
        Self::connect_with_server(running, options).await
    }

    async fn connect_with_server(mut running: RunningServer, options: ClientOptions) -> Result<Arc<Client>> {
        // The Transport takes ownership of the real pipes; `running` keeps
        // placeholder I/O from here on and is retained only for its process
        // handle, which `shutdown` still reaches through `RunningServer::teardown`'s
        // wait/terminate/kill sequence.
        let reader = std::mem::replace(&mut running.reader, Box::pin(tokio::io::empty()));
        let writer = std::mem::replace(&mut running.writer, Box::pin(tokio::io::sink()));

        // 2. Start the transport's writer and read-loop tasks.
        let transport = Transport::spawn(reader, writer, options.request_timeout);
        let registry = Arc::new(CapabilityRegistry::new(options.capabilities));

        // 3. Send `initialize`. A single folder named "root" is a
        // single-root workspace and also populates the legacy `root_uri`.
        let root_uri = match options.workspace_folders.as_slice() {
            [only] if only.name == "root" => Some(only.uri.clone()),
            _ => None,
        };
        let workspace_folders = options
            .workspace_folders
            .iter()
            .cloned()
            .map(lsp_types::WorkspaceFolder::from)
            .collect::<Vec<_>>();
        let init_params = InitializeParams {
            process_id: Some(std::process::id()),
            client_info: options.client_info,
            root_uri,
            workspace_folders: Some(workspace_folders),
            initialization_options: options.initialization_options,
            capabilities: registry.merged_client_capabilities(),
            ..Default::default()
        };
        let init_value = match transport
            .request("initialize", serde_json::to_value(init_params)?)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = running.teardown(options.teardown_grace).await;
                return Err(e);
            }
        };
        let init_result: InitializeResult = serde_json::from_value(init_value)?;

        // 4-5. Assert the server advertises what every composed capability needs.
        if let Err(e) = registry.check_server_capabilities(&init_result.capabilities, init_result.server_info.as_ref()) {
            let _ = transport.notify("exit", serde_json::json!(null));
            let _ = running.teardown(options.teardown_grace).await;
            return Err(e);
        }

        // 6. Acknowledge with `initialized`.
        transport.notify("initialized", serde_json::to_value(InitializedParams {})?)?;

        // 7. Build the dispatch table and start the dispatcher task.
        let dispatch_table = Arc::new(registry.build_dispatch_table());
        let dispatch_rx = transport
            .dispatch_channel()
            .ok_or_else(|| Error::Internal("dispatch channel already taken".into()))?;
        let dispatcher = tokio::spawn(Self::dispatch_loop(dispatch_rx, dispatch_table));

        let buffers = FileBuffers::new(transport.clone());

        // 8. Ready.
        let client = Arc::new(Client {
            transport,
            buffers,
            server_info: init_result.server_info,
            server_capabilities: init_result.capabilities,
            state: StateCell::new(ClientState::Ready),
            teardown_grace: options.teardown_grace,
            running_server: parking_lot::Mutex::new(Some(running)),
            dispatcher: parking_lot::Mutex::new(Some(dispatcher)),
        });
        Ok(client)
    }

    async fn dispatch_loop(
        mut dispatch_rx: tokio::sync::mpsc::Receiver<DispatchItem>,
        table: Arc<crate::registry::DispatchTable>,
    ) {
        while let Some(item) = dispatch_rx.recv().await {
            match item {
                DispatchItem::Request { method, params, reply, .. } => {
                    let table = table.clone();
                    tokio::spawn(async move {
                        let result = table.handle_request(&method, params).await;
                        let _ = reply.send(result);
                    });
                }
                DispatchItem::Notification { method, params } => {
                    let handlers = table.handlers_for_notification(&method);
                    if handlers.is_empty() {
                        tracing::debug!("lspkit: no handler registered for notification {method}");
                        continue;
                    }
                    for handler in handlers {
                        let params = params.clone();
                        tokio::spawn(async move { handler.handle(params).await });
                    }
                }
            }
        }
    }

    pub fn state(&self) -> ClientState {
        self.state.get()
    }

    pub fn server_info(&self) -> Option<&lsp_types::ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn server_capabilities(&self) -> &lsp_types::ServerCapabilities {
        &self.server_capabilities
    }

    pub fn open_files(&self) -> &Arc<FileBuffers> {
        &self.buffers
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state.get() {
            ClientState::Ready => Ok(()),
            other => Err(Error::State(format!("client is not Ready (currently {other:?})"))),
        }
    }

    /// Escape hatch for notifications not covered by a typed method (e.g. a
    /// custom `$/...` extension, or a capability that only needs to be
    /// triggered, not awaited).
    pub fn notify(&self, method: impl Into<String>, params: impl serde::Serialize) -> Result<()> {
        self.ensure_ready()?;
        self.transport.notify(method, serde_json::to_value(params)?)
    }

    pub fn did_change_configuration(&self, settings: serde_json::Value) -> Result<()> {
        self.notify(
            "workspace/didChangeConfiguration",
            lsp_types::DidChangeConfigurationParams { settings },
        )
    }

    async fn call(&self, method: &'static str, params: impl serde::Serialize) -> Result<serde_json::Value> {
        self.ensure_ready()?;
        let params = serde_json::to_value(params)?;
        match self.transport.request(method, params).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.poisons_transport() || self.transport.is_failed() {
                    self.state.set(ClientState::Failed);
                }
                Err(e)
            }
        }
    }

    pub async fn hover(&self, uri: Url, position: Position) -> Result<Option<Hover>> {
        let params = HoverParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: Default::default(),
        };
        let value = self.call("textDocument/hover", params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn references(&self, uri: Url, position: Position, include_declaration: bool) -> Result<Vec<lsp_types::Location>> {
        let params = ReferenceParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            context: ReferenceContext { include_declaration },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("textDocument/references", params).await?;
        Ok(serde_json::from_value::<Option<Vec<lsp_types::Location>>>(value)?.unwrap_or_default())
    }

    pub async fn goto_definition(&self, uri: Url, position: Position) -> Result<Option<GotoDefinitionResponse>> {
        let params = GotoDefinitionParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("textDocument/definition", params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn document_symbols(&self, uri: Url) -> Result<Option<DocumentSymbolResponse>> {
        let params = DocumentSymbolParams {
            text_document: TextDocumentIdentifier { uri },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("textDocument/documentSymbol", params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn completion(&self, uri: Url, position: Position) -> Result<Option<CompletionResponse>> {
        let params = CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        };
        let value = self.call("textDocument/completion", params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn prepare_call_hierarchy(&self, uri: Url, position: Position) -> Result<Vec<CallHierarchyItem>> {
        let params = CallHierarchyPrepareParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: Default::default(),
        };
        let value = self.call("textDocument/prepareCallHierarchy", params).await?;
        Ok(serde_json::from_value::<Option<Vec<CallHierarchyItem>>>(value)?.unwrap_or_default())
    }

    pub async fn incoming_calls(&self, item: CallHierarchyItem) -> Result<Vec<CallHierarchyIncomingCall>> {
        let params = CallHierarchyIncomingCallsParams {
            item,
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("callHierarchy/incomingCalls", params).await?;
        Ok(serde_json::from_value::<Option<Vec<CallHierarchyIncomingCall>>>(value)?.unwrap_or_default())
    }

    pub async fn outgoing_calls(&self, item: CallHierarchyItem) -> Result<Vec<CallHierarchyOutgoingCall>> {
        let params = CallHierarchyOutgoingCallsParams {
            item,
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("callHierarchy/outgoingCalls", params).await?;
        Ok(serde_json::from_value::<Option<Vec<CallHierarchyOutgoingCall>>>(value)?.unwrap_or_default())
    }

    pub async fn workspace_symbol(&self, query: impl Into<String>) -> Result<Option<WorkspaceSymbolResponse>> {
        let params = WorkspaceSymbolParams {
            query: query.into(),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        let value = self.call("workspace/symbol", params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn inline_value(&self, uri: Url, range: Range, context: InlineValueContext) -> Result<Vec<InlineValue>> {
        let params = InlineValueParams {
            text_document: TextDocumentIdentifier { uri },
            range,
            context,
            work_done_progress_params: Default::default(),
        };
        let value = self.call("textDocument/inlineValue", params).await?;
        Ok(serde_json::from_value::<Option<Vec<InlineValue>>>(value)?.unwrap_or_default())
    }

    /// Step down through `ShuttingDown` to `Exited`: send `shutdown`, wait
    /// for every in-flight request to drain, send `exit`, and tear down the
    /// underlying server process or connection.
    pub async fn shutdown(self: Arc<Self>) -> Result<()> {
        if self.state.get() == ClientState::Failed {
            let running = self.running_server.lock().take();
            if let Some(running) = running {
                let _ = running.teardown(self.teardown_grace).await;
            }
            return Ok(());
        }
        self.state.set(ClientState::ShuttingDown);
        let shutdown_result = self
            .transport
            .request_with_id(lspkit_core::id::RequestId::shutdown(), "shutdown", serde_json::json!(null))
            .await;
        self.transport.pending().wait_complete().await;
        let _ = self.transport.notify("exit", serde_json::json!(null));

        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
        let running = self.running_server.lock().take();
        if let Some(running) = running {
            running.teardown(self.teardown_grace).await?;
        }
        self.state.set(ClientState::Exited);
        shutdown_result.map(|_| ())
    }
}
