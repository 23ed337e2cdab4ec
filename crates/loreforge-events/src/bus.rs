//! Fan-out publish/subscribe with per-handler panic isolation.
//!
//! The bus maps event type tags to ordered handler lists. Publishing
//! snapshots the handler list under a read lock, releases the lock, then
//! dispatches on a background task -- so a handler may subscribe further
//! handlers without deadlock, and the publisher never waits for handler
//! completion.
//!
//! Each handler runs inside its own spawned task. A panicking handler is
//! caught at the task boundary, logged with its panic message, and never
//! prevents sibling handlers from running. Handler errors are likewise
//! logged and isolated. Every handler registered at publish time is
//! invoked exactly once per publish, in insertion order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tracing::{error, warn};

use crate::event::GameEvent;

/// Error type handlers may return; logged and isolated by the bus.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscribed handler: shared, callable, returning a boxed future.
pub type EventHandler =
    Arc<dyn Fn(Arc<dyn GameEvent>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// In-process event bus.
///
/// Cheap to clone via [`Arc`]; concurrent `subscribe` and `publish` are
/// safe. Handler lists grow append-only; subscribing the same handler
/// twice means it runs twice per publish.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type. Appends; duplicates are kept.
    pub fn subscribe(&self, event_type: &str, handler: EventHandler) {
        if let Ok(mut map) = self.handlers.write() {
            map.entry(event_type.to_owned()).or_default().push(handler);
        }
    }

    /// Register an async closure for an event type.
    ///
    /// Convenience wrapper around [`subscribe`](Self::subscribe) that
    /// boxes the returned future.
    pub fn on<F, Fut>(&self, event_type: &str, handler: F)
    where
        F: Fn(Arc<dyn GameEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let wrapped: EventHandler = Arc::new(move |event| Box::pin(handler(event)));
        self.subscribe(event_type, wrapped);
    }

    /// Number of handlers currently registered for an event type.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .ok()
            .map(|map| map.get(event_type).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Publish an event: schedule dispatch to every handler registered
    /// for its type at this moment, then return.
    ///
    /// Fire-and-forget from the publisher's perspective; delivery to each
    /// snapshot handler is guaranteed to be attempted. Must be called
    /// from within a tokio runtime.
    pub fn publish(&self, event: Arc<dyn GameEvent>) {
        let snapshot = self.snapshot(event.event_type());
        if snapshot.is_empty() {
            return;
        }
        tokio::spawn(dispatch(snapshot, event));
    }

    /// Publish an event and wait for every handler to finish.
    ///
    /// Same isolation guarantees as [`publish`](Self::publish); used
    /// where completion matters (tests, shutdown flushes).
    pub async fn publish_and_wait(&self, event: Arc<dyn GameEvent>) {
        let snapshot = self.snapshot(event.event_type());
        dispatch(snapshot, event).await;
    }

    /// Snapshot the handler list for a type, holding the read lock only
    /// long enough to clone the `Arc`s.
    fn snapshot(&self, event_type: &str) -> Vec<EventHandler> {
        self.handlers
            .read()
            .ok()
            .and_then(|map| map.get(event_type).cloned())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self
            .handlers
            .read()
            .map(|map| map.len())
            .unwrap_or_default();
        f.debug_struct("EventBus").field("types", &types).finish()
    }
}

/// Run every handler in order, each inside its own panic boundary.
async fn dispatch(handlers: Vec<EventHandler>, event: Arc<dyn GameEvent>) {
    let event_type = event.event_type().to_owned();
    for handler in handlers {
        let event = Arc::clone(&event);
        // A separate task per handler turns panics into JoinErrors
        // instead of unwinding into the dispatch loop.
        let task = tokio::spawn(async move { handler(event).await });
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(event_type, error = %e, "Event handler error");
            }
            Err(join_error) => {
                if join_error.is_panic() {
                    error!(
                        event_type,
                        panic = panic_message(join_error),
                        "Event handler panic"
                    );
                } else {
                    warn!(event_type, "Event handler cancelled");
                }
            }
        }
    }
}

/// Extract a readable message from a panicking handler's payload.
fn panic_message(join_error: tokio::task::JoinError) -> String {
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("opaque panic payload")
    }
}
