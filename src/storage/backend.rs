use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::storage::events::StorageEvents;

/// Classification of a persistence backend.
///
/// The kind determines both which backing area a persisted value lives in and
/// whether changes from other execution contexts are folded in: only the
/// local kind has a portable change-notification feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Durable, shared across execution contexts, change-notified.
    Local,
    /// Scoped to the current execution context.
    Session,
    /// Durable key/value database; no portable change notifications.
    Indexed,
}

impl StorageKind {
    /// Whether mutations made by other execution contexts are observable
    /// through the provider's change feed.
    pub fn syncs_across_tabs(self) -> bool {
        matches!(self, StorageKind::Local)
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Local => "local",
            StorageKind::Session => "session",
            StorageKind::Indexed => "indexed",
        })
    }
}

/// Failure raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage access denied: {0}")]
    AccessDenied(String),
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Uniform key/value capability exposed by every backend.
pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Supplies backends for the current execution context.
///
/// This is the backend selector: [`is_available`](Self::is_available) is the
/// "is there a storage context at all" predicate, [`open`](Self::open) hands
/// out one area per [`StorageKind`], and [`events`](Self::events) is the
/// change feed for the local kind.
pub trait StorageProvider: Send + Sync {
    fn is_available(&self) -> bool;
    fn open(&self, kind: StorageKind) -> Result<Arc<dyn StorageArea>, StorageError>;
    fn events(&self) -> Arc<StorageEvents>;
}

/// Backend handle resolved once when a persisted value is constructed.
pub(crate) struct ResolvedBackend {
    pub(crate) area: Arc<dyn StorageArea>,
    pub(crate) events: Option<Arc<StorageEvents>>,
}

/// Resolve a provider into Available/Unavailable for one kind.
///
/// An unavailable provider, or one whose `open` fails, yields `None`: the
/// persisted value then reads as its initial value and writes are no-ops.
/// That is normal operation outside a storage context, not a failure.
pub(crate) fn resolve(
    provider: &Arc<dyn StorageProvider>,
    kind: StorageKind,
) -> Option<ResolvedBackend> {
    if !provider.is_available() {
        return None;
    }
    let area = match provider.open(kind) {
        Ok(area) => area,
        Err(e) => {
            log::debug!("{kind} storage could not be opened, treating as absent: {e}");
            return None;
        }
    };
    let events = if kind.syncs_across_tabs() {
        Some(provider.events())
    } else {
        None
    };
    Some(ResolvedBackend { area, events })
}

/// Provider for execution contexts with no storage at all.
///
/// Every persisted value built against it keeps its initial value in memory
/// and skips persistence entirely.
pub struct Detached;

impl StorageProvider for Detached {
    fn is_available(&self) -> bool {
        false
    }

    fn open(&self, _kind: StorageKind) -> Result<Arc<dyn StorageArea>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn events(&self) -> Arc<StorageEvents> {
        // Never reached: resolution bails on is_available first.
        Arc::new(StorageEvents::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_kind_syncs() {
        assert!(StorageKind::Local.syncs_across_tabs());
        assert!(!StorageKind::Session.syncs_across_tabs());
        assert!(!StorageKind::Indexed.syncs_across_tabs());
    }

    #[test]
    fn kind_names() {
        assert_eq!(StorageKind::Local.to_string(), "local");
        assert_eq!(StorageKind::Session.to_string(), "session");
        assert_eq!(StorageKind::Indexed.to_string(), "indexed");
    }

    #[test]
    fn detached_resolves_to_absent() {
        let provider: Arc<dyn StorageProvider> = Arc::new(Detached);
        assert!(resolve(&provider, StorageKind::Local).is_none());
    }
}
