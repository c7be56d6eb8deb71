//! JSON-RPC request router
//!
//! Owns the pending-request table and both directions of a connection:
//! - outbound requests get monotonic ids and settle exactly once
//!   (response, error payload, timeout or connection close)
//! - inbound server requests are answered by method-keyed handlers running
//!   on their own tasks, so a slow handler never stalls the reader
//! - inbound notifications are queued to a dispatcher task in arrival order

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};

use super::protocol::{Message, Notification, Request, RequestId, Response, ResponseError};
use super::transport::{FrameReader, write_frame};
use crate::error::LspError;

/// Handler for a server-initiated request
pub type RequestHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ResponseError>> + Send + Sync>;

/// Handler for a server notification; runs on the dispatcher task
pub type NotificationHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type Outcome = Result<Value, LspError>;

struct PendingRequest {
    method: String,
    created: Instant,
    deadline: Instant,
    tx: oneshot::Sender<Outcome>,
}

pub struct RequestRouter {
    name: String,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    request_handlers: RwLock<HashMap<String, RequestHandler>>,
    notification_handlers: RwLock<HashMap<String, Vec<NotificationHandler>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    closed: watch::Sender<Option<String>>,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl RequestRouter {
    /// Create a detached router; handlers may be registered before [`attach`](Self::attach)
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (closed, _) = watch::channel(None);
        Arc::new(Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            request_handlers: RwLock::new(HashMap::new()),
            notification_handlers: RwLock::new(HashMap::new()),
            outbound: Mutex::new(None),
            closed,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Bind the router to a byte stream pair and start the reader, writer and dispatcher tasks
    pub async fn attach<R, W>(self: &Arc<Self>, reader: R, writer: W)
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (note_tx, note_rx) = mpsc::unbounded_channel::<Notification>();
        *self.outbound.lock().await = Some(out_tx);

        let writer_task = tokio::spawn(Arc::clone(self).write_loop(writer, out_rx));
        let dispatch_task = tokio::spawn(Arc::clone(self).dispatch_loop(note_rx));
        let reader_task = tokio::spawn(Arc::clone(self).read_loop(FrameReader::new(reader), note_tx));
        let reader_abort = reader_task.abort_handle();
        let supervisor = tokio::spawn(Arc::clone(self).supervise_reader(reader_task));

        self.tasks.lock().await.extend([
            writer_task.abort_handle(),
            dispatch_task.abort_handle(),
            reader_abort,
            supervisor.abort_handle(),
        ]);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Handler registration
    // ========================================================================

    pub async fn on_request<F, Fut>(&self, method: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, ResponseError>> + Send + 'static,
    {
        let handler: RequestHandler = Arc::new(move |params| Box::pin(handler(params)));
        self.request_handlers
            .write()
            .await
            .insert(method.to_string(), handler);
    }

    /// Register a notification handler; several handlers per method run in registration order
    pub async fn on_notification<F>(&self, method: &str, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.notification_handlers
            .write()
            .await
            .entry(method.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Send a request and wait until it settles
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, LspError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            // Checked under the table lock so a concurrent close cannot miss this entry
            if let Some(reason) = self.close_reason() {
                return Err(LspError::ConnectionClosed(reason));
            }
            pending.insert(
                id,
                PendingRequest {
                    method: method.to_string(),
                    created: Instant::now(),
                    deadline: Instant::now() + timeout,
                    tx,
                },
            );
        }

        tracing::trace!("{} request {}: {}", self.name, id, method);

        if let Err(e) = self.enqueue(&Message::Request(Request::new(id, method, params))).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(LspError::ConnectionClosed(format!(
                "{} dropped request {}",
                self.name, id
            ))),
            Err(_) => {
                let removed = self.pending.lock().await.remove(&id);
                if removed.is_none() {
                    // Settled between the deadline and the removal; keep that outcome
                    if let Ok(outcome) = rx.try_recv() {
                        return outcome;
                    }
                }
                tracing::debug!("{} request {} '{}' timed out after {:?}", self.name, id, method, timeout);
                let _ = self
                    .send_notification("$/cancelRequest", Some(serde_json::json!({ "id": id })))
                    .await;
                Err(LspError::timeout(method, timeout))
            }
        }
    }

    /// Send a notification (fire-and-forget)
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), LspError> {
        self.enqueue(&Message::Notification(Notification::new(method, params)))
            .await
    }

    async fn enqueue(&self, message: &Message) -> Result<(), LspError> {
        let json = message.to_json()?;
        let outbound = self.outbound.lock().await;
        let sender = outbound.as_ref().ok_or_else(|| {
            LspError::ConnectionClosed(
                self.close_reason()
                    .unwrap_or_else(|| format!("{} is not attached", self.name)),
            )
        })?;
        sender
            .send(json)
            .map_err(|_| LspError::ConnectionClosed(format!("{} writer stopped", self.name)))
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Tear the connection down; only the first reason is kept.
    /// Every pending request fails with `ConnectionClosed`.
    pub async fn close(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let drained: Vec<(u64, PendingRequest)> = {
            let mut pending = self.pending.lock().await;
            let first = self.closed.send_if_modified(|current| {
                if current.is_none() {
                    *current = Some(reason.clone());
                    true
                } else {
                    false
                }
            });
            if !first {
                return;
            }
            pending.drain().collect()
        };

        // Dropping the sender lets the writer flush what is queued and stop
        self.outbound.lock().await.take();

        if !drained.is_empty() {
            tracing::debug!(
                "{}: failing {} pending requests: {}",
                self.name,
                drained.len(),
                reason
            );
        }
        let now = Instant::now();
        for (id, entry) in drained {
            tracing::trace!(
                "{} request {} '{}' closed after {:?}, {:?} left before its deadline",
                self.name,
                id,
                entry.method,
                now.saturating_duration_since(entry.created),
                entry.deadline.saturating_duration_since(now)
            );
            let _ = entry.tx.send(Err(LspError::ConnectionClosed(reason.clone())));
        }
    }

    pub fn close_reason(&self) -> Option<String> {
        self.closed.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.borrow().is_some()
    }

    /// Observe the close reason (`None` while open)
    pub fn subscribe_closed(&self) -> watch::Receiver<Option<String>> {
        self.closed.subscribe()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Abort all background tasks (used after the process is gone)
    pub async fn abort_tasks(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    // ========================================================================
    // Background tasks
    // ========================================================================

    async fn write_loop<W>(self: Arc<Self>, mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        while let Some(json) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &json).await {
                tracing::error!("{} write failed: {}", self.name, e);
                self.close(format!("write failed: {}", e)).await;
                break;
            }
        }
    }

    /// A panicking reader must still fail every pending request
    async fn supervise_reader(self: Arc<Self>, reader: JoinHandle<()>) {
        if let Err(e) = reader.await
            && e.is_panic()
        {
            tracing::error!("{} reader task panicked", self.name);
            self.close(format!("{} reader task panicked", self.name)).await;
        }
    }

    async fn read_loop<R>(
        self: Arc<Self>,
        mut reader: FrameReader<R>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        loop {
            match reader.read_message().await {
                Ok(Message::Response(response)) => self.settle(response).await,
                Ok(Message::Request(request)) => self.spawn_server_request(request).await,
                Ok(Message::Notification(notification)) => {
                    let _ = notifications.send(notification);
                }
                Err(LspError::ConnectionClosed(reason)) => {
                    tracing::debug!("{} connection closed: {}", self.name, reason);
                    self.close(reason).await;
                    break;
                }
                Err(e) => {
                    tracing::error!("{} protocol failure: {}", self.name, e);
                    self.close(e.to_string()).await;
                    break;
                }
            }
        }
    }

    async fn settle(&self, response: Response) {
        let Some(id) = response.id.as_ref().and_then(RequestId::as_number) else {
            tracing::debug!("{} response without usable id: {:?}", self.name, response.id);
            return;
        };

        match self.pending.lock().await.remove(&id) {
            Some(entry) => {
                let outcome = response.into_result().map_err(LspError::from);
                let _ = entry.tx.send(outcome);
            }
            None => {
                tracing::debug!(
                    "{} response for unknown request {} (may have timed out)",
                    self.name,
                    id
                );
            }
        }
    }

    async fn spawn_server_request(self: &Arc<Self>, request: Request) {
        let handler = self
            .request_handlers
            .read()
            .await
            .get(&request.method)
            .cloned();
        let router = Arc::clone(self);

        tokio::spawn(async move {
            let Request {
                id, method, params, ..
            } = request;
            let outcome = match handler {
                Some(handler) => {
                    let fut = handler(params.unwrap_or(Value::Null));
                    match tokio::spawn(fut).await {
                        Ok(result) => result,
                        Err(e) => Err(ResponseError::internal(format!(
                            "Handler for {} failed: {}",
                            method, e
                        ))),
                    }
                }
                None => {
                    tracing::debug!("{} unhandled server request: {}", router.name, method);
                    Err(ResponseError::method_not_found(&method))
                }
            };
            if let Err(e) = router
                .enqueue(&Message::Response(Response::reply(id, outcome)))
                .await
            {
                tracing::debug!("{} could not answer {}: {}", router.name, method, e);
            }
        });
    }

    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Notification>) {
        while let Some(notification) = rx.recv().await {
            let handlers = self
                .notification_handlers
                .read()
                .await
                .get(&notification.method)
                .cloned();
            let Some(handlers) = handlers else {
                tracing::trace!("{} unhandled notification: {}", self.name, notification.method);
                continue;
            };
            let params = notification.params.unwrap_or(Value::Null);
            for handler in handlers {
                if std::panic::catch_unwind(AssertUnwindSafe(|| handler(&params))).is_err() {
                    tracing::warn!(
                        "{} notification handler for {} panicked",
                        self.name,
                        notification.method
                    );
                }
            }
        }
    }
}
