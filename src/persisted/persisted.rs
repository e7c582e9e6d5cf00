use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::runtime::StorageRuntime;
use crate::serializer::{Serializer, SerializerError};
use crate::storage::{
    resolve, ResolvedBackend, StorageArea, StorageError, StorageEvent, StorageEvents, StorageKind,
    StorageProvider,
};
use crate::store::{Activator, Deactivate, Store, StoreSetter, Subscription};

use super::options::{Options, ParseErrorHook, Transform, WriteErrorHook};

/// Failure surfaced to the `on_write_error` hook: either serialization of the
/// outgoing value or the backend write itself.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("serialize: {0}")]
    Serialize(#[from] SerializerError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

struct Inner<T> {
    kind: StorageKind,
    key: String,
    initial: T,
    store: Store<T>,
    area: Option<Arc<dyn StorageArea>>,
    serializer: Arc<dyn Serializer<T>>,
    before_write: Option<Transform<T>>,
    on_write_error: WriteErrorHook,
    // Serializes mutators on this handle so update() reads the value its
    // write will replace.
    mutate: Mutex<()>,
}

/// A reactive value mirrored to a persistent storage backend.
///
/// Loaded from storage once at construction, written through on every `set`,
/// and (for the local kind) kept in sync with changes made by other execution
/// contexts. Handles are cheap clones of one shared state; the registry in
/// [`StorageRuntime`] guarantees one live instance per (kind, key).
///
/// Failures never reach the caller: parse failures fall back to the initial
/// value or skip the change, and a failed write still updates the in-memory
/// value so it reflects caller intent. The `on_parse_error` and
/// `on_write_error` hooks are the only failure signals.
pub struct Persisted<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Persisted<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Persisted<T> {
    pub(crate) fn build(
        provider: &Arc<dyn StorageProvider>,
        kind: StorageKind,
        key: &str,
        initial: T,
        options: Options<T>,
    ) -> Self {
        let Options {
            serializer,
            sync_tabs,
            on_write_error,
            on_parse_error,
            before_read,
            before_write,
        } = options;

        let on_write_error: WriteErrorHook = on_write_error.unwrap_or_else(|| {
            let key = key.to_string();
            Arc::new(move |e: &WriteError| {
                log::error!("error when writing value from persisted store {key:?} to {kind} storage: {e}");
            })
        });
        let on_parse_error: ParseErrorHook = on_parse_error.unwrap_or_else(|| {
            let key = key.to_string();
            Arc::new(move |raw: &str, e: &SerializerError| {
                log::error!("error when parsing {raw:?} from persisted store {key:?}: {e}");
            })
        });

        let backend = resolve(provider, kind);
        let current = maybe_load_initial(
            &backend,
            key,
            &initial,
            serializer.as_ref(),
            before_read.as_ref(),
            &on_parse_error,
        );

        let events = match &backend {
            Some(b) if sync_tabs => b.events.clone(),
            _ => None,
        };
        let store = match events {
            Some(events) => Store::with_activator(
                current,
                cross_tab_activator(
                    events,
                    key.to_string(),
                    Arc::clone(&serializer),
                    before_read,
                    Arc::clone(&on_parse_error),
                ),
            ),
            None => Store::new(current),
        };

        Self {
            inner: Arc::new(Inner {
                kind,
                key: key.to_string(),
                initial,
                store,
                area: backend.map(|b| b.area),
                serializer,
                before_write,
                on_write_error,
                mutate: Mutex::new(()),
            }),
        }
    }

    /// Current in-memory value; never touches storage.
    pub fn get(&self) -> T {
        self.inner.store.get()
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn kind(&self) -> StorageKind {
        self.inner.kind
    }

    /// Persist `value`, then make it visible to subscribers.
    ///
    /// A failed write still updates the in-memory value; `on_write_error` is
    /// the failure signal, never a panic or error return. A subscriber may
    /// call `set`/`update`/`reset` on the same handle from inside its
    /// notification.
    pub fn set(&self, value: T) {
        let result = {
            let _guard = self.inner.mutate.lock().unwrap();
            self.write_through(&value)
        };
        self.publish(value, result);
    }

    /// Compute the next value from the current one and set it.
    ///
    /// Reads the live registered value at call time, so immediately
    /// successive updates compose (two `+1` updates on 10 yield 12).
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        let (next, result) = {
            let _guard = self.inner.mutate.lock().unwrap();
            let next = f(self.inner.store.get());
            let result = self.write_through(&next);
            (next, result)
        };
        self.publish(next, result);
    }

    /// Set back to the initial value supplied at first registration.
    pub fn reset(&self) {
        self.set(self.inner.initial.clone());
    }

    /// Register `listener`: it runs immediately with the current value and
    /// again on every change, including changes arriving from other tabs.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    // Runs with the mutate lock already released, so a hook or subscriber
    // calling back into set/update/reset does not relock and deadlock.
    fn publish(&self, value: T, result: Result<(), WriteError>) {
        if let Err(e) = result {
            (self.inner.on_write_error)(&e);
        }
        self.inner.store.set(value);
    }

    fn write_through(&self, value: &T) -> Result<(), WriteError> {
        let Some(area) = &self.inner.area else {
            return Ok(());
        };
        let outgoing = match &self.inner.before_write {
            Some(f) => f(value.clone()),
            None => value.clone(),
        };
        let text = self.inner.serializer.stringify(&outgoing)?;
        area.set_item(&self.inner.key, &text)?;
        Ok(())
    }
}

/// Resolve the value a persisted store starts with: the stored one when
/// present and parseable, the caller's initial value otherwise. The initial
/// value is never written back implicitly.
fn maybe_load_initial<T: Clone>(
    backend: &Option<ResolvedBackend>,
    key: &str,
    initial: &T,
    serializer: &dyn Serializer<T>,
    before_read: Option<&Transform<T>>,
    on_parse_error: &ParseErrorHook,
) -> T {
    let Some(backend) = backend else {
        return initial.clone();
    };
    match backend.area.get_item(key) {
        Ok(Some(text)) => match serializer.parse(&text) {
            Ok(value) => match before_read {
                Some(f) => f(value),
                None => value,
            },
            Err(e) => {
                on_parse_error(&text, &e);
                initial.clone()
            }
        },
        Ok(None) => initial.clone(),
        Err(e) => {
            // Not in the error taxonomy surfaced to hooks; an unreadable
            // backend behaves like an absent one for this load.
            log::warn!("could not read persisted store {key:?} during load: {e}");
            initial.clone()
        }
    }
}

/// Activator folding external change notifications into the store.
///
/// Attached on first subscriber, detached with the last. Matching events are
/// parsed, passed through `before_read`, and pushed directly via the setter:
/// the other context already persisted the value, so no write-back.
fn cross_tab_activator<T: Clone + Send + Sync + 'static>(
    events: Arc<StorageEvents>,
    key: String,
    serializer: Arc<dyn Serializer<T>>,
    before_read: Option<Transform<T>>,
    on_parse_error: ParseErrorHook,
) -> Activator<T> {
    Box::new(move |setter: StoreSetter<T>| {
        let key = key.clone();
        let serializer = Arc::clone(&serializer);
        let before_read = before_read.clone();
        let on_parse_error = Arc::clone(&on_parse_error);
        let subscription = events.subscribe(move |event: &StorageEvent| {
            if event.key != key {
                return;
            }
            // Deletion notifications leave the current value in place.
            let Some(raw) = event.new_value.as_deref() else {
                return;
            };
            let parsed = match serializer.parse(raw) {
                Ok(value) => value,
                Err(e) => {
                    on_parse_error(raw, &e);
                    return;
                }
            };
            let next = match &before_read {
                Some(f) => f(parsed),
                None => parsed,
            };
            setter.set(next);
        });
        Some(Box::new(move || drop(subscription)) as Deactivate)
    })
}

/// Persisted value in local storage, synchronized across tabs.
///
/// Equivalent to [`state_with`] with [`StorageKind::Local`] and default
/// options. First registration of a key wins: a second call with the same key
/// returns the existing instance and ignores `initial`.
pub fn local_state<T>(key: &str, initial: T) -> Persisted<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    state_with(StorageKind::Local, key, initial, Options::default())
}

/// [`local_state`] with explicit options.
pub fn local_state_with<T>(key: &str, initial: T, options: Options<T>) -> Persisted<T>
where
    T: Clone + Send + Sync + 'static,
{
    state_with(StorageKind::Local, key, initial, options)
}

/// Persisted value in session storage: scoped to this execution context, not
/// synchronized across tabs.
pub fn session_state<T>(key: &str, initial: T) -> Persisted<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    state_with(StorageKind::Session, key, initial, Options::default())
}

/// [`session_state`] with explicit options.
pub fn session_state_with<T>(key: &str, initial: T, options: Options<T>) -> Persisted<T>
where
    T: Clone + Send + Sync + 'static,
{
    state_with(StorageKind::Session, key, initial, options)
}

/// Persisted value in the indexed key/value database: durable, not
/// synchronized across tabs.
pub fn indexed_state<T>(key: &str, initial: T) -> Persisted<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    state_with(StorageKind::Indexed, key, initial, Options::default())
}

/// [`indexed_state`] with explicit options.
pub fn indexed_state_with<T>(key: &str, initial: T, options: Options<T>) -> Persisted<T>
where
    T: Clone + Send + Sync + 'static,
{
    state_with(StorageKind::Indexed, key, initial, options)
}

/// Persisted value of the given kind, registered in the current
/// [`StorageRuntime`].
pub fn state_with<T>(kind: StorageKind, key: &str, initial: T, options: Options<T>) -> Persisted<T>
where
    T: Clone + Send + Sync + 'static,
{
    StorageRuntime::current().state(kind, key, initial, options)
}
