//! Language server lifecycle and query facades
//!
//! A [`LanguageServer`] owns one backend process and one connection. Its
//! behavior is parameterized by the backend's [`CapabilityProfile`]; the
//! lifecycle itself is the same for every backend:
//!
//! ```text
//! NotStarted → Starting → Handshaking → PostHandshake → Ready → ShuttingDown → Stopped
//!                      (any live state) → Failed
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;

use super::capabilities::{Backend, CapabilityProfile, Readiness, RecomputeDetector};
use super::converters::{
    convert_diagnostic, convert_document_symbols, convert_hover, convert_location,
    parse_signature_help,
};
use super::documents::{DocumentCache, SyncAction};
use super::process::{LaunchSpec, ProcessHost, ProcessLauncher};
use super::protocol::{
    DefinitionResponse, DocumentSymbolResponse, Hover, InitializeResult, LspTypeHierarchyItem,
    PublishDiagnosticsParams, TextDocumentPositionParams,
};
use super::router::RequestRouter;
use super::state::{ServerState, StateMachine};
use super::watcher::{FileEvent, FileEventDebouncer};
use crate::config;
use crate::error::LspError;
use crate::infra::file_filter::FileFilter;
use crate::models::lsp::{
    Diagnostic, FileChangeType, HoverInfo, Location, Position, SignatureHelp, path_to_uri,
};
use crate::models::symbol::SymbolInfo;

const DIAGNOSTICS_CAPACITY: usize = 200;
const DIAGNOSTICS_WAIT: Duration = Duration::from_secs(2);

/// Published diagnostics per URI, bounded by insertion order
#[derive(Default)]
struct DiagnosticStore {
    by_uri: HashMap<String, Vec<Diagnostic>>,
    order: VecDeque<String>,
}

impl DiagnosticStore {
    fn publish(&mut self, uri: String, diagnostics: Vec<Diagnostic>) {
        if !self.by_uri.contains_key(&uri) {
            if self.order.len() >= DIAGNOSTICS_CAPACITY
                && let Some(oldest) = self.order.pop_front()
            {
                self.by_uri.remove(&oldest);
                tracing::trace!("Evicted diagnostics for {}", oldest);
            }
            self.order.push_back(uri.clone());
        }
        self.by_uri.insert(uri, diagnostics);
    }
}

/// State written by server notifications and read by callers
struct Signals {
    ready: watch::Sender<bool>,
    recompute: watch::Sender<bool>,
    diagnostics: watch::Sender<DiagnosticStore>,
    detector: RecomputeDetector,
}

impl Signals {
    fn new() -> Self {
        Self {
            ready: watch::channel(false).0,
            recompute: watch::channel(false).0,
            diagnostics: watch::channel(DiagnosticStore::default()).0,
            detector: RecomputeDetector::default(),
        }
    }

    fn reset(&self) {
        self.ready.send_replace(false);
        self.recompute.send_replace(false);
        self.diagnostics.send_replace(DiagnosticStore::default());
    }
}

pub struct LanguageServer {
    name: String,
    root: PathBuf,
    profile: CapabilityProfile,
    state: Arc<StateMachine>,
    router: RwLock<Option<Arc<RequestRouter>>>,
    host: Mutex<Option<ProcessHost>>,
    capabilities: RwLock<Value>,
    documents: Mutex<DocumentCache>,
    signals: Arc<Signals>,
    cross_file_waited: AtomicBool,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl LanguageServer {
    pub fn new(profile: CapabilityProfile, root: impl Into<PathBuf>) -> Arc<Self> {
        let name = profile.backend.to_string();
        Arc::new(Self {
            state: Arc::new(StateMachine::new(name.clone())),
            name,
            root: root.into(),
            profile,
            router: RwLock::new(None),
            host: Mutex::new(None),
            capabilities: RwLock::new(Value::Null),
            documents: Mutex::new(DocumentCache::default()),
            signals: Arc::new(Signals::new()),
            cross_file_waited: AtomicBool::new(false),
            monitor: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> Backend {
        self.profile.backend
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> ServerState {
        self.state.current()
    }

    pub async fn wait_for_state<F>(&self, predicate: F) -> ServerState
    where
        F: Fn(ServerState) -> bool,
    {
        self.state.wait_for(predicate).await
    }

    /// Capabilities from the initialize response (`null` before the handshake)
    pub async fn capabilities(&self) -> Value {
        self.capabilities.read().await.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Launch the backend and drive it to `Ready`
    ///
    /// Only valid from `NotStarted`; after a stop or failure call [`reset`](Self::reset) first.
    pub async fn start(
        &self,
        launcher: &dyn ProcessLauncher,
        spec: &LaunchSpec,
    ) -> Result<(), LspError> {
        self.state.transition(ServerState::Starting)?;

        match self.run_startup(launcher, spec).await {
            Ok(()) => {
                tracing::info!("{} language server ready", self.name);
                Ok(())
            }
            Err(e) => {
                self.state.fail(&e.to_string());
                self.teardown("startup failed").await;
                Err(e)
            }
        }
    }

    async fn run_startup(
        &self,
        launcher: &dyn ProcessLauncher,
        spec: &LaunchSpec,
    ) -> Result<(), LspError> {
        self.signals.reset();

        let mut host = launcher.launch(spec).await?;
        let io = host.take_io().ok_or_else(|| {
            LspError::ServerStart(format!("{} has no stdio to attach", host.label()))
        })?;
        *self.host.lock().await = Some(host);

        let router = RequestRouter::new(self.name.clone());
        self.register_handlers(&router).await;
        router.attach(io.reader, io.writer).await;
        *self.router.write().await = Some(Arc::clone(&router));
        self.spawn_monitor(&router).await;

        self.state.transition(ServerState::Handshaking)?;
        let params = self
            .profile
            .initialize_params(&self.root, Some(std::process::id()));
        let result = router
            .send_request(
                "initialize",
                Some(params),
                config::timeout_for(self.backend(), "initialize"),
            )
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;

        if let Some(info) = &init.server_info {
            tracing::debug!(
                "{} server info: {} {}",
                self.name,
                info.name,
                info.version.as_deref().unwrap_or("")
            );
        }
        self.profile.verify(&init.capabilities)?;
        *self.capabilities.write().await = init.capabilities;

        router.send_notification("initialized", Some(json!({}))).await?;
        self.state.transition(ServerState::PostHandshake)?;

        self.await_readiness().await?;
        self.state.transition(ServerState::Ready)?;
        Ok(())
    }

    async fn await_readiness(&self) -> Result<(), LspError> {
        if self.profile.readiness.signals().is_empty() {
            return Ok(());
        }

        let limit = config::ready_timeout();
        tracing::debug!(
            "Waiting up to {}ms for {} readiness signal",
            limit.as_millis(),
            self.name
        );

        tokio::select! {
            _ = wait_true(self.signals.ready.subscribe()) => {
                tracing::debug!("{} readiness signal received", self.name);
                Ok(())
            }
            state = self.state.wait_for(ServerState::is_terminal) => {
                Err(LspError::NotReady(state))
            }
            _ = tokio::time::sleep(limit) => {
                tracing::warn!(
                    "{} sent no readiness signal within {:?}; continuing",
                    self.name,
                    limit
                );
                Ok(())
            }
        }
    }

    /// Fail the state machine when the connection closes outside a shutdown
    async fn spawn_monitor(&self, router: &Arc<RequestRouter>) {
        let mut closed = router.subscribe_closed();
        let state = Arc::clone(&self.state);
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            if closed.wait_for(Option::is_some).await.is_err() {
                return;
            }
            let reason = closed.borrow().clone().unwrap_or_default();
            match state.current() {
                ServerState::ShuttingDown | ServerState::Stopped => {
                    tracing::debug!("{} connection closed during shutdown: {}", name, reason);
                }
                _ => {
                    state.fail(&format!("connection closed: {}", reason));
                }
            }
        });

        if let Some(previous) = self.monitor.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// `shutdown` request, `exit` notification, then kill after the grace period
    pub async fn shutdown(&self) -> Result<(), LspError> {
        let current = self.state.current();
        if current == ServerState::NotStarted {
            return Ok(());
        }

        if !current.is_terminal() {
            self.state.transition(ServerState::ShuttingDown)?;
            let router = self.router.read().await.clone();
            if let Some(router) = router {
                let timeout = config::timeout_for(self.backend(), "shutdown");
                if let Err(e) = router.send_request("shutdown", None, timeout).await {
                    tracing::debug!("{} shutdown request failed: {}", self.name, e);
                }
                if let Err(e) = router.send_notification("exit", None).await {
                    tracing::debug!("{} exit notification failed: {}", self.name, e);
                }
            }
        }

        self.teardown("client shutdown").await;

        if !current.is_terminal() {
            self.state.transition(ServerState::Stopped)?;
        }
        tracing::info!("{} language server stopped", self.name);
        Ok(())
    }

    async fn teardown(&self, reason: &str) {
        let router = self.router.read().await.clone();
        if let Some(router) = router {
            router.close(reason).await;
        }
        if let Some(mut host) = self.host.lock().await.take() {
            host.terminate(config::shutdown_grace()).await;
        }
        self.documents.lock().await.drain();
    }

    /// Return a stopped or failed server to `NotStarted` so it can be started again
    pub async fn reset(&self) -> Result<(), LspError> {
        self.state.reset()?;
        if let Some(previous) = self.router.write().await.take() {
            previous.abort_tasks().await;
        }
        if let Some(monitor) = self.monitor.lock().await.take() {
            monitor.abort();
        }
        *self.capabilities.write().await = Value::Null;
        self.signals.reset();
        self.cross_file_waited.store(false, Ordering::Release);
        Ok(())
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    async fn register_handlers(&self, router: &RequestRouter) {
        let readiness = self.profile.readiness;
        let watch_recompute = self.profile.has_recompute_signal();

        router
            .on_request("workspace/configuration", |params| async move {
                let count = params
                    .get("items")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Ok(Value::Array(vec![json!({}); count]))
            })
            .await;

        router
            .on_request("client/registerCapability", |_| async { Ok(Value::Null) })
            .await;

        router
            .on_request("client/unregisterCapability", |_| async { Ok(Value::Null) })
            .await;
        router
            .on_request("window/workDoneProgress/create", |_| async { Ok(Value::Null) })
            .await;
        router
            .on_request("workspace/executeClientCommand", |_| async { Ok(json!([])) })
            .await;
        router
            .on_request("window/showMessageRequest", |params| async move {
                Ok(choose_message_action(&params))
            })
            .await;

        for signal in readiness.signals() {
            let signals = Arc::clone(&self.signals);
            let method = signal.method();
            router
                .on_notification(method, move |params| {
                    if readiness.is_signal(method, params) {
                        signals.ready.send_replace(true);
                    }
                })
                .await;
        }

        if watch_recompute {
            let signals = Arc::clone(&self.signals);
            router
                .on_notification("metals/status", move |params| {
                    if signals.detector.observe_status(params) {
                        tracing::debug!("Background compilation finished; results may be stale");
                        signals.recompute.send_replace(true);
                    }
                })
                .await;
        }

        {
            let signals = Arc::clone(&self.signals);
            let name = self.name.clone();
            router
                .on_notification("window/logMessage", move |params| {
                    log_server_message(&name, params);
                    if watch_recompute && RecomputeDetector::observe_log(params) {
                        signals.recompute.send_replace(true);
                    }
                })
                .await;
        }

        {
            let name = self.name.clone();
            router
                .on_notification("window/showMessage", move |params| {
                    log_server_message(&name, params);
                })
                .await;
        }

        {
            let signals = Arc::clone(&self.signals);
            router
                .on_notification("textDocument/publishDiagnostics", move |params| {
                    match serde_json::from_value::<PublishDiagnosticsParams>(params.clone()) {
                        Ok(published) => {
                            let diagnostics: Vec<Diagnostic> = published
                                .diagnostics
                                .into_iter()
                                .map(convert_diagnostic)
                                .collect();
                            tracing::debug!(
                                "Cached {} diagnostics for {}",
                                diagnostics.len(),
                                published.uri
                            );
                            signals
                                .diagnostics
                                .send_modify(|store| store.publish(published.uri, diagnostics));
                        }
                        Err(e) => tracing::debug!("Malformed publishDiagnostics: {}", e),
                    }
                })
                .await;
        }
    }

    // ========================================================================
    // Query facades
    // ========================================================================

    async fn ready_router(&self) -> Result<Arc<RequestRouter>, LspError> {
        let state = self.state.current();
        if state != ServerState::Ready {
            return Err(LspError::NotReady(state));
        }
        self.router
            .read()
            .await
            .clone()
            .ok_or(LspError::NotReady(state))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, LspError> {
        let router = self.ready_router().await?;
        router
            .send_request(
                method,
                Some(params),
                config::timeout_for(self.backend(), method),
            )
            .await
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Open or update `path` on the server; returns its URI
    pub async fn sync_document(&self, path: &Path) -> Result<String, LspError> {
        let router = self.ready_router().await?;
        let path = self.absolute(path);
        let content = tokio::fs::read_to_string(&path).await?;

        // Held across the sends so versions reach the server in order
        let mut documents = self.documents.lock().await;
        let plan = documents.sync(&path, &content);

        if let Some(evicted) = plan.evicted {
            router
                .send_notification(
                    "textDocument/didClose",
                    Some(json!({ "textDocument": { "uri": evicted } })),
                )
                .await?;
        }

        match &plan.action {
            SyncAction::Open { uri, version } => {
                router
                    .send_notification(
                        "textDocument/didOpen",
                        Some(json!({
                            "textDocument": {
                                "uri": uri,
                                "languageId": self.backend().language().lsp_id(),
                                "version": version,
                                "text": content
                            }
                        })),
                    )
                    .await?;
            }
            SyncAction::Change { uri, version } => {
                router
                    .send_notification(
                        "textDocument/didChange",
                        Some(json!({
                            "textDocument": { "uri": uri, "version": version },
                            "contentChanges": [{ "text": content }]
                        })),
                    )
                    .await?;
            }
            SyncAction::Unchanged { .. } => {}
        }

        Ok(plan.action.uri().to_string())
    }

    async fn position_params(&self, path: &Path, position: Position) -> Result<Value, LspError> {
        let uri = self.sync_document(path).await?;
        Ok(serde_json::to_value(TextDocumentPositionParams::new(
            uri, position,
        ))?)
    }

    async fn locations(&self, method: &str, params: Value) -> Result<Vec<Location>, LspError> {
        let result = self.request(method, params).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        let response: DefinitionResponse = serde_json::from_value(result)?;
        Ok(response
            .into_locations()
            .into_iter()
            .map(convert_location)
            .collect())
    }

    pub async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInfo>, LspError> {
        let uri = self.sync_document(path).await?;
        let result = self
            .request(
                "textDocument/documentSymbol",
                json!({ "textDocument": { "uri": uri } }),
            )
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        let response: DocumentSymbolResponse = serde_json::from_value(result)?;
        Ok(convert_document_symbols(response))
    }

    pub async fn definition(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<Location>, LspError> {
        let params = self.position_params(path, position).await?;
        self.locations("textDocument/definition", params).await
    }

    /// References to the symbol at `position`
    ///
    /// Backends with background compilation get one recompute retry: the
    /// query is reissued if the recompute signal arrives within the settle
    /// timeout and both result sets are merged.
    pub async fn references(
        &self,
        path: &Path,
        position: Position,
        include_declaration: bool,
    ) -> Result<Vec<Location>, LspError> {
        let mut params = self.position_params(path, position).await?;
        if let Some(obj) = params.as_object_mut() {
            obj.insert(
                "context".to_string(),
                json!({ "includeDeclaration": include_declaration }),
            );
        }
        self.ensure_cross_file_ready().await;

        match self.profile.settle_timeout {
            Some(settle) => self.references_with_recompute(params, settle).await,
            None => self.locations("textDocument/references", params).await,
        }
    }

    async fn references_with_recompute(
        &self,
        params: Value,
        settle: Duration,
    ) -> Result<Vec<Location>, LspError> {
        self.signals.recompute.send_replace(false);
        let recompute = self.signals.recompute.subscribe();

        let first = self
            .locations("textDocument/references", params.clone())
            .await?;

        if !matches!(
            tokio::time::timeout(settle, wait_true(recompute)).await,
            Ok(true)
        ) {
            return Ok(first);
        }

        tracing::debug!("{} recomputed after references; querying again", self.name);
        match self.locations("textDocument/references", params).await {
            Ok(second) => Ok(merge_locations(first, second)),
            Err(e) => {
                tracing::debug!("{} references retry failed: {}", self.name, e);
                Ok(first)
            }
        }
    }

    async fn ensure_cross_file_ready(&self) {
        let wait = self.profile.cross_file_wait;
        if wait.is_zero() {
            return;
        }
        if self
            .cross_file_waited
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::debug!(
                "Waiting {}ms for {} cross-file indexing",
                wait.as_millis(),
                self.name
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn hover(&self, path: &Path, position: Position) -> Result<Option<HoverInfo>, LspError> {
        let params = self.position_params(path, position).await?;
        let result = self.request("textDocument/hover", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        let hover: Hover = serde_json::from_value(result)?;
        Ok(convert_hover(hover))
    }

    pub async fn signature_help(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Option<SignatureHelp>, LspError> {
        let params = self.position_params(path, position).await?;
        let result = self.request("textDocument/signatureHelp", params).await?;
        Ok(parse_signature_help(&result))
    }

    /// Diagnostics last published for `path`, waiting briefly for a first publication
    pub async fn diagnostics(&self, path: &Path) -> Result<Vec<Diagnostic>, LspError> {
        let uri = self.sync_document(path).await?;
        let mut rx = self.signals.diagnostics.subscribe();
        let published = tokio::time::timeout(DIAGNOSTICS_WAIT, async {
            let _ = rx.wait_for(|store| store.by_uri.contains_key(&uri)).await;
        })
        .await;
        if published.is_err() {
            tracing::debug!("{} published no diagnostics for {}", self.name, uri);
        }

        let diagnostics = self
            .signals
            .diagnostics
            .borrow()
            .by_uri
            .get(&uri)
            .cloned()
            .unwrap_or_default();
        Ok(diagnostics)
    }

    pub async fn prepare_type_hierarchy(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<LspTypeHierarchyItem>, LspError> {
        let params = self.position_params(path, position).await?;
        let result = self
            .request("textDocument/prepareTypeHierarchy", params)
            .await?;
        parse_hierarchy_items(result)
    }

    pub async fn supertypes(
        &self,
        item: &LspTypeHierarchyItem,
    ) -> Result<Vec<LspTypeHierarchyItem>, LspError> {
        let result = self
            .request("typeHierarchy/supertypes", json!({ "item": item }))
            .await?;
        parse_hierarchy_items(result)
    }

    pub async fn subtypes(
        &self,
        item: &LspTypeHierarchyItem,
    ) -> Result<Vec<LspTypeHierarchyItem>, LspError> {
        let result = self
            .request("typeHierarchy/subtypes", json!({ "item": item }))
            .await?;
        parse_hierarchy_items(result)
    }

    /// Forward one debounced batch as `workspace/didChangeWatchedFiles`
    pub async fn did_change_watched_files(&self, events: &[FileEvent]) -> Result<(), LspError> {
        if events.is_empty() {
            return Ok(());
        }
        let router = self.ready_router().await?;

        let changes: Vec<Value> = events
            .iter()
            .map(|e| json!({ "uri": path_to_uri(&e.path), "type": e.change.to_lsp() }))
            .collect();

        {
            let mut documents = self.documents.lock().await;
            for event in events.iter().filter(|e| e.change == FileChangeType::Deleted) {
                if let Some(uri) = documents.close(&event.path) {
                    router
                        .send_notification(
                            "textDocument/didClose",
                            Some(json!({ "textDocument": { "uri": uri } })),
                        )
                        .await?;
                }
            }
        }

        router
            .send_notification(
                "workspace/didChangeWatchedFiles",
                Some(json!({ "changes": changes })),
            )
            .await
    }

    /// Entry point for an external file watcher
    ///
    /// Events are debounced, filtered by the profile's ignored directories
    /// and sent as `workspace/didChangeWatchedFiles` until the server stops.
    pub fn file_watcher(self: &Arc<Self>) -> FileEventDebouncer {
        let filter = FileFilter::with_ignored_dirs(&self.root, self.profile.ignored_dirs);
        let (debouncer, rx) = FileEventDebouncer::new(filter, config::debounce());
        drop(self.forward_file_events(rx));
        debouncer
    }

    /// Drain debounced file-event batches into this server until it stops
    pub fn forward_file_events(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<Vec<FileEvent>>,
    ) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                if server.state().is_terminal() {
                    break;
                }
                if let Err(e) = server.did_change_watched_files(&batch).await {
                    tracing::debug!("{} dropped {} file events: {}", server.name, batch.len(), e);
                }
            }
        })
    }
}

impl Drop for LanguageServer {
    fn drop(&mut self) {
        if let Some(host) = self.host.get_mut().as_mut() {
            host.start_kill();
            tracing::debug!("{} dropped, process killed", self.name);
        }
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}

async fn wait_true(mut rx: watch::Receiver<bool>) -> bool {
    rx.wait_for(|value| *value).await.is_ok()
}

fn parse_hierarchy_items(result: Value) -> Result<Vec<LspTypeHierarchyItem>, LspError> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(result)?)
}

/// Union of two result sets keyed by (uri, range), first-seen order preserved
pub fn merge_locations(first: Vec<Location>, second: Vec<Location>) -> Vec<Location> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|loc| seen.insert((loc.uri.clone(), loc.range)))
        .collect()
}

/// Answer for `window/showMessageRequest`
fn choose_message_action(params: &Value) -> Value {
    let Some(actions) = params
        .get("actions")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
    else {
        return Value::Null;
    };
    actions
        .iter()
        .find(|a| a.get("title").and_then(Value::as_str) == Some("Import build"))
        .or_else(|| actions.first())
        .cloned()
        .unwrap_or(Value::Null)
}

fn log_server_message(name: &str, params: &Value) {
    let message = params.get("message").and_then(Value::as_str).unwrap_or("");
    match params.get("type").and_then(Value::as_u64) {
        Some(1) => tracing::error!("{}: {}", name, message),
        Some(2) => tracing::warn!("{}: {}", name, message),
        Some(3) => tracing::info!("{}: {}", name, message),
        _ => tracing::debug!("{}: {}", name, message),
    }
}
