//! Server lifecycle event source.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Observable transitions of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Starting,
    Started,
    Stopping,
    Stopped,
    Failed { reason: String },
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Starting => write!(f, "starting"),
            LifecycleEvent::Started => write!(f, "started"),
            LifecycleEvent::Stopping => write!(f, "stopping"),
            LifecycleEvent::Stopped => write!(f, "stopped"),
            LifecycleEvent::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Callback subscribed to lifecycle events.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Registry of lifecycle listeners.
///
/// `emit` runs listeners synchronously on the calling thread, in
/// registration order. Listeners may be registered from any thread.
#[derive(Default)]
pub struct LifecycleEvents {
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl LifecycleEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.write().push(listener);
    }

    pub fn emit(&self, event: LifecycleEvent) {
        // Snapshot so listeners can register further listeners.
        let listeners: Vec<_> = self.listeners.read().clone();
        tracing::debug!(event = %event, listeners = listeners.len(), "Lifecycle event");
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl fmt::Debug for LifecycleEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
