//! # Keepsake
//!
//! Persisted reactive stores for Rust: in-memory reactive values mirrored to
//! a persistent key/value backend and kept consistent across handles and
//! execution contexts.
//!
//! ## Persisted values
//!
//! [`local_state`], [`session_state`], and [`indexed_state`] build a reactive
//! value backed by the corresponding [`StorageKind`]. The value is loaded
//! from storage once, written through on every `set`/`update`, and, for the
//! local kind, updated when another tab changes the same key. Requesting a
//! key twice returns the same live instance, so independently obtained
//! handles share subscribers and state.
//!
//! Failures stay out of the caller's way: corrupt stored data falls back to
//! the initial value, a full or broken backend still lets the in-memory value
//! follow `set` calls, and both cases are reported through optional hooks.
//!
//! ## Storage contexts
//!
//! A [`StorageRuntime`] pairs a backend provider with the registry of live
//! values. The global runtime is detached (no storage, values stay in
//! memory); run under [`StorageRuntime::scope`] with a provider such as
//! [`MemoryStorage`] or your own [`StorageProvider`] to persist for real.
//!
//! ```
//! use keepsake::{local_state, MemoryStorage, StorageRuntime};
//!
//! StorageRuntime::scope(MemoryStorage::new(), || {
//!     let counter = local_state("counter", 0);
//!     let sub = counter.subscribe(|n| println!("counter is {n}"));
//!
//!     counter.set(5);
//!     counter.update(|n| n + 1);
//!     assert_eq!(counter.get(), 6);
//!     sub.unsubscribe();
//! });
//! ```

pub mod persisted;
pub mod runtime;
pub mod serializer;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use persisted::{
    indexed_state, indexed_state_with, local_state, local_state_with, session_state,
    session_state_with, state_with, Options, Persisted, WriteError,
};
pub use runtime::StorageRuntime;
pub use serializer::{Json, Serializer, SerializerError};
pub use storage::{
    Detached, MemoryStorage, StorageArea, StorageError, StorageEvent, StorageEvents, StorageKind,
    StorageProvider,
};
pub use store::{Store, Subscription};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        StorageRuntime::scope(MemoryStorage::new(), || {
            let counter = local_state("counter", 0);
            assert_eq!(counter.get(), 0);
            counter.set(42);
            assert_eq!(counter.get(), 42);
        });
    }
}
