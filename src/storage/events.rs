use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Notification that another execution context changed a stored value.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    /// `None` signals deletion of the key.
    pub new_value: Option<String>,
}

type EventHandler = Box<dyn Fn(&StorageEvent) + Send + Sync>;

struct EventEntry {
    id: usize,
    active: AtomicBool,
    handler: EventHandler,
}

type EntryList = Arc<RwLock<Vec<Arc<EventEntry>>>>;

/// Hub distributing external-change notifications to interested listeners.
///
/// Models the browser `storage` event: a provider emits an event here only
/// for mutations made by *other* execution contexts, never for writes issued
/// through the local process's own persisted values.
pub struct StorageEvents {
    listeners: EntryList,
    next_id: AtomicUsize,
}

impl StorageEvents {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Register a handler for every future event. The returned subscription
    /// detaches on drop.
    pub fn subscribe<F>(&self, handler: F) -> EventSubscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let entry = Arc::new(EventEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            active: AtomicBool::new(true),
            handler: Box::new(handler),
        });
        self.listeners.write().unwrap().push(Arc::clone(&entry));
        EventSubscription {
            listeners: Arc::downgrade(&self.listeners),
            entry,
        }
    }

    /// Deliver an event to all active listeners, in registration order.
    pub fn emit(&self, event: &StorageEvent) {
        let snapshot = self.listeners.read().unwrap().to_vec();
        for entry in &snapshot {
            if entry.active.load(Ordering::Acquire) {
                (entry.handler)(event);
            }
        }
    }
}

impl Default for StorageEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration token for a [`StorageEvents`] listener.
pub struct EventSubscription {
    listeners: Weak<RwLock<Vec<Arc<EventEntry>>>>,
    entry: Arc<EventEntry>,
}

impl EventSubscription {
    /// Detach the listener. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.entry.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().unwrap().retain(|e| e.id != self.entry.id);
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(key: &str, new_value: Option<&str>) -> StorageEvent {
        StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        }
    }

    #[test]
    fn delivers_to_subscribers() {
        let hub = StorageEvents::new();
        let seen = Arc::new(RwLock::new(Vec::new()));

        let sub = hub.subscribe({
            let seen = Arc::clone(&seen);
            move |e: &StorageEvent| seen.write().unwrap().push(e.key.clone())
        });

        hub.emit(&event("a", Some("1")));
        hub.emit(&event("b", None));

        assert_eq!(*seen.read().unwrap(), vec!["a".to_string(), "b".to_string()]);
        sub.unsubscribe();
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let hub = StorageEvents::new();
        let count = Arc::new(AtomicUsize::new(0));

        let sub = hub.subscribe({
            let count = Arc::clone(&count);
            move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        hub.emit(&event("k", Some("1")));
        sub.unsubscribe();
        sub.unsubscribe();
        hub.emit(&event("k", Some("2")));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_detaches() {
        let hub = StorageEvents::new();
        let count = Arc::new(AtomicUsize::new(0));

        {
            let _sub = hub.subscribe({
                let count = Arc::clone(&count);
                move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            });
            hub.emit(&event("k", Some("1")));
        }
        hub.emit(&event("k", Some("2")));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
