use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Cleanup returned by an [`Activator`], run when the last subscriber
/// detaches.
pub type Deactivate = Box<dyn FnOnce() + Send>;

/// Hook invoked when the subscriber count goes from zero to one.
///
/// Receives a [`StoreSetter`] that pushes values straight into the store, and
/// may return a cleanup that runs once the count is back to zero. This is the
/// seam used to acquire external resources (such as a cross-tab listener)
/// only while someone is actually watching.
pub type Activator<T> = Box<dyn Fn(StoreSetter<T>) -> Option<Deactivate> + Send + Sync>;

struct SubscriberEntry<T> {
    id: usize,
    active: AtomicBool,
    callback: Callback<T>,
}

struct Activation {
    live: usize,
    cleanup: Option<Deactivate>,
}

struct Shared<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<Arc<SubscriberEntry<T>>>>,
    next_id: AtomicUsize,
    activator: Option<Activator<T>>,
    activation: Mutex<Activation>,
}

impl<T: Clone> Shared<T> {
    fn notify(&self) {
        // Iterate a snapshot so a listener may unsubscribe (itself or
        // another) mid-notification without deadlocking on the list lock.
        let snapshot = self.value.read().unwrap().clone();
        let subscribers = self.subscribers.read().unwrap().to_vec();
        for entry in &subscribers {
            if entry.active.load(Ordering::Acquire) {
                (entry.callback)(&snapshot);
            }
        }
    }
}

impl<T> Shared<T> {
    fn unsubscribe(shared: &Arc<Shared<T>>, entry: &Arc<SubscriberEntry<T>>) {
        if !entry.active.swap(false, Ordering::AcqRel) {
            return;
        }
        shared.subscribers.write().unwrap().retain(|e| e.id != entry.id);
        let cleanup = {
            let mut activation = shared.activation.lock().unwrap();
            activation.live -= 1;
            if activation.live == 0 {
                activation.cleanup.take()
            } else {
                None
            }
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

/// A thread-safe reactive container.
///
/// Holds one value and an observer list; every `set`/`update` notifies
/// subscribers synchronously with the new value. Cloning the store clones the
/// handle, not the state.
pub struct Store<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial value.
    pub fn new(initial: T) -> Self {
        Self::build(initial, None)
    }

    /// Create a store with a lazy activation hook.
    ///
    /// The activator runs when the first subscriber attaches; the cleanup it
    /// returns runs when the last subscriber detaches. Re-subscribing after
    /// that re-activates.
    pub fn with_activator(initial: T, activator: Activator<T>) -> Self {
        Self::build(initial, Some(activator))
    }

    fn build(initial: T, activator: Option<Activator<T>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: RwLock::new(initial),
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicUsize::new(0),
                activator,
                activation: Mutex::new(Activation {
                    live: 0,
                    cleanup: None,
                }),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.shared.value.read().unwrap().clone()
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.shared.value.read().unwrap();
        f(&value)
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, new_value: T) {
        *self.shared.value.write().unwrap() = new_value;
        self.shared.notify();
    }

    /// Update the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.shared.value.write().unwrap();
            f(&mut value);
        }
        self.shared.notify();
    }

    /// Handle that pushes values into this store directly.
    pub fn setter(&self) -> StoreSetter<T> {
        StoreSetter {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Subscribe to value changes.
    ///
    /// The callback runs immediately with the current value and again on
    /// every subsequent change. Dropping the returned [`Subscription`] (or
    /// calling [`Subscription::unsubscribe`]) detaches it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let entry = Arc::new(SubscriberEntry {
            id: self.shared.next_id.fetch_add(1, Ordering::SeqCst),
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.shared.subscribers.write().unwrap().push(Arc::clone(&entry));

        // 0 -> 1 attaches the activator before the initial replay, so a value
        // the activator pushes is not lost between the two.
        {
            let mut activation = self.shared.activation.lock().unwrap();
            activation.live += 1;
            if activation.live == 1 {
                if let Some(activator) = &self.shared.activator {
                    activation.cleanup = activator(self.setter());
                }
            }
        }

        let current = self.get();
        (entry.callback)(&current);

        let shared = Arc::clone(&self.shared);
        Subscription {
            cancel: Box::new(move || Shared::unsubscribe(&shared, &entry)),
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Cloneable setter that writes the value and notifies, bypassing any
/// write-through side effects layered on top of the store.
pub struct StoreSetter<T> {
    shared: Weak<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> StoreSetter<T> {
    pub fn set(&self, value: T) {
        if let Some(shared) = self.shared.upgrade() {
            *shared.value.write().unwrap() = value;
            shared.notify();
        }
    }
}

impl<T> Clone for StoreSetter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

/// Registration token for a store subscriber.
///
/// `unsubscribe` is idempotent and always callable; dropping the handle also
/// unsubscribes.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.cancel)()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        (self.cancel)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn store_get_set() {
        let store = Store::new(0);
        assert_eq!(store.get(), 0);
        store.set(42);
        assert_eq!(store.get(), 42);
    }

    #[test]
    fn store_update_in_place() {
        let store = Store::new(vec![1, 2]);
        store.update(|v| v.push(3));
        assert_eq!(store.get(), vec![1, 2, 3]);
    }

    #[test]
    fn with_reads_without_cloning() {
        let store = Store::new(vec![1, 2, 3]);
        let len = store.with(|v| v.len());
        assert_eq!(len, 3);
    }

    #[test]
    fn subscribe_replays_current_value_then_changes() {
        let store = Store::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sub = store.subscribe({
            let seen = Arc::clone(&seen);
            move |v: &i32| seen.lock().unwrap().push(*v)
        });
        store.set(2);
        store.set(3);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        sub.unsubscribe();

        store.set(4);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = Store::new(0);
        let count = Arc::new(AtomicUsize::new(0));

        let sub = store.subscribe({
            let count = Arc::clone(&count);
            move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        sub.unsubscribe();
        sub.unsubscribe();
        store.set(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself_mid_notification() {
        let store = Store::new(0);
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));

        let sub = store.subscribe({
            let slot = Arc::clone(&slot);
            let count = Arc::clone(&count);
            move |v: &i32| {
                count.fetch_add(1, Ordering::SeqCst);
                if *v >= 1 {
                    if let Some(sub) = slot.lock().unwrap().take() {
                        sub.unsubscribe();
                    }
                }
            }
        });
        *slot.lock().unwrap() = Some(sub);

        let other = Arc::new(AtomicUsize::new(0));
        let _other_sub = store.subscribe({
            let other = Arc::clone(&other);
            move |_| {
                other.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.set(1);
        store.set(2);

        // Initial replay + the notification it detached during.
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // The other listener kept receiving: replay + two sets.
        assert_eq!(other.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn activator_runs_on_first_subscribe_and_cleans_up_on_last() {
        let activations = Arc::new(AtomicUsize::new(0));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let store = Store::with_activator(0, {
            let activations = Arc::clone(&activations);
            let cleanups = Arc::clone(&cleanups);
            Box::new(move |setter: StoreSetter<i32>| {
                activations.fetch_add(1, Ordering::SeqCst);
                setter.set(7);
                let cleanups = Arc::clone(&cleanups);
                Some(Box::new(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                }) as Deactivate)
            })
        });

        let sub_a = store.subscribe(|_| {});
        // The activator pushed before the replay, so the first value seen is 7.
        assert_eq!(store.get(), 7);
        let sub_b = store.subscribe(|_| {});
        assert_eq!(activations.load(Ordering::SeqCst), 1);

        sub_a.unsubscribe();
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
        sub_b.unsubscribe();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        // Re-subscribing re-activates.
        let _sub_c = store.subscribe(|_| {});
        assert_eq!(activations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn setter_outlives_store_harmlessly() {
        let setter = {
            let store = Store::new(1);
            store.setter()
        };
        // Store dropped; pushing through the stale setter is a no-op.
        setter.set(2);
    }
}
