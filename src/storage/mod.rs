//! Storage kinds, the backend contract, and external-change notifications.
//!
//! Backends are key/value stores addressed by string key. A provider decides
//! which backends exist in the current execution context; the local kind
//! additionally carries a change feed so mutations made by other contexts
//! (other tabs, other processes sharing the area) can be observed.

mod backend;
mod events;
mod memory;

pub use backend::{Detached, StorageArea, StorageError, StorageKind, StorageProvider};
pub use events::{EventSubscription, StorageEvent, StorageEvents};
pub use memory::{MemoryArea, MemoryStorage};

pub(crate) use backend::{resolve, ResolvedBackend};
