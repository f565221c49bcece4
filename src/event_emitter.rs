use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

struct Listener {
    id: ListenerId,
    once: bool,
    callback: Callback,
}

/// Handle returned by [`EventEmitter::on`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Synchronous, in-process event emitter.
///
/// Listeners run on the emitting thread, in registration order, after the
/// emitter has released its own lock, so a listener may register or remove
/// listeners (or emit) without deadlocking.
pub struct EventEmitter {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        EventEmitter {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener called on every emission of `event`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.register(event.into(), false, Arc::new(listener))
    }

    /// Register a listener that is dropped after its first call.
    pub fn once<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.register(event.into(), true, Arc::new(listener))
    }

    /// Call every listener of `event` with `data`. Returns how many ran.
    pub fn emit(&self, event: &str, data: &dyn Any) -> usize {
        let callbacks: Vec<Callback> = {
            let mut listeners = self
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match listeners.get_mut(event) {
                Some(event_listeners) => {
                    let callbacks = event_listeners
                        .iter()
                        .map(|listener| Arc::clone(&listener.callback))
                        .collect();
                    event_listeners.retain(|listener| !listener.once);
                    callbacks
                }
                None => return 0,
            }
        };

        for callback in &callbacks {
            callback(data);
        }
        callbacks.len()
    }

    pub fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match listeners.get_mut(event) {
            Some(event_listeners) => {
                let before = event_listeners.len();
                event_listeners.retain(|listener| listener.id != id);
                before != event_listeners.len()
            }
            None => false,
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    fn register(&self, event: String, once: bool, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(Listener { id, once, callback });
        id
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
