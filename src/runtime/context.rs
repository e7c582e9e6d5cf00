use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::persisted::{Options, Persisted};
use crate::storage::{Detached, StorageKind, StorageProvider};

/// Registry of live persisted values: kind -> key -> type-erased handle.
///
/// Entries are created lazily on first request and live as long as the
/// runtime; they are never evicted, so repeated requests for the same key
/// hand back the same live object and subscribers share state.
struct Registry {
    entries: HashMap<StorageKind, HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn get(&self, kind: StorageKind, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.entries
            .get(&kind)
            .and_then(|keys| keys.get(key))
            .map(|handle| &**handle)
    }

    fn insert(&mut self, kind: StorageKind, key: String, handle: Box<dyn Any + Send + Sync>) {
        self.entries.entry(kind).or_default().insert(key, handle);
    }
}

/// Storage context: one backend provider plus the registry of live persisted
/// values built against it.
///
/// The factory functions ([`local_state`](crate::local_state) and friends)
/// use the *current* runtime: the innermost scoped runtime on this thread, or
/// the global one. The global runtime is detached (no storage), which is the
/// correct behavior for a plain process; embedders with a real backend run
/// their code under [`scope`](Self::scope) or hold a runtime built with
/// [`new`](Self::new).
///
/// # Examples
///
/// ```
/// use keepsake::{local_state, MemoryStorage, StorageRuntime};
///
/// StorageRuntime::scope(MemoryStorage::new(), || {
///     let theme = local_state("theme", String::from("dark"));
///     assert_eq!(theme.get(), "dark");
/// });
/// // Runtime, registry, and all its state are dropped here
/// ```
pub struct StorageRuntime {
    provider: Arc<dyn StorageProvider>,
    registry: Mutex<Registry>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<StorageRuntime>>> = RefCell::new(vec![]);
}

impl StorageRuntime {
    /// Create a runtime over the given provider.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            registry: Mutex::new(Registry::new()),
        })
    }

    /// Get or create the global runtime (fallback).
    ///
    /// Detached: a headless process has no storage context, so values built
    /// here keep their initial value and skip persistence.
    pub fn global() -> Arc<Self> {
        static RUNTIME: OnceLock<Arc<StorageRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(|| StorageRuntime::new(Arc::new(Detached))))
    }

    /// Get the current runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a fresh runtime over `provider` as the current
    /// context. Useful for tests and for isolating independent registries.
    pub fn scope<F, R>(provider: Arc<dyn StorageProvider>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(provider), f)
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// Pushes the runtime onto the thread-local stack for the duration of the
    /// function execution.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The provider this runtime resolves backends from.
    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        Arc::clone(&self.provider)
    }

    /// Obtain the persisted value registered under `(kind, key)`,
    /// constructing it on first request.
    ///
    /// On a registry hit the existing handle is returned unchanged and the
    /// supplied `initial` and `options` are ignored entirely, even when they
    /// differ from the first caller's. First registration wins; this is the
    /// documented sharing semantic, not a defect.
    ///
    /// # Panics
    ///
    /// If `key` is empty, or if the key was previously registered under the
    /// same kind with a different value type.
    pub fn state<T>(&self, kind: StorageKind, key: &str, initial: T, options: Options<T>) -> Persisted<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        assert!(!key.is_empty(), "persisted state key must be non-empty");

        // The registry lock is held across check-then-act so concurrent
        // first requests for one key cannot both construct.
        let mut registry = self.registry.lock().unwrap();
        if let Some(existing) = registry.get(kind, key) {
            return match existing.downcast_ref::<Persisted<T>>() {
                Some(handle) => handle.clone(),
                None => panic!(
                    "persisted state {key:?} ({kind} kind) was previously registered with a different value type"
                ),
            };
        }

        let handle = Persisted::build(&self.provider, kind, key, initial, options);
        registry.insert(kind, key.to_string(), Box::new(handle.clone()));
        handle
    }
}
