//! Change notification relay
//!
//! Handlers carry no payload: a call means "something changed, list again".
//! They run on the cache's update task, so they must return quickly.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Zero-argument change callback
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Registered handlers, shared between the adapter and the cache task
#[derive(Clone, Default)]
pub struct EventRelay {
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: EventHandler) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.push(handler);
        debug!(count = handlers.len(), "Registered event handler");
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every handler once
    pub(crate) fn dispatch(&self) {
        // Snapshot so a handler may register another without deadlocking.
        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            handler();
        }
    }
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRelay")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Handler that turns change signals into a coalescing channel
///
/// The channel holds at most one pending signal; further signals while one is
/// pending are dropped, so the dispatch path never blocks on a slow consumer.
pub fn notify_channel() -> (EventHandler, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    let handler: EventHandler = Arc::new(move || {
        let _ = tx.try_send(());
    });
    (handler, rx)
}
