use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::storage::backend::{StorageArea, StorageError, StorageKind, StorageProvider};
use crate::storage::events::{StorageEvent, StorageEvents};

/// In-process storage provider backing all three kinds with hash-map areas.
///
/// Stands in for a browser-like storage context in native processes, tests,
/// and demos. Writes made through a persisted value do not fire the change
/// feed; [`external_set`](Self::external_set) and
/// [`broadcast`](Self::broadcast) simulate mutations arriving from another
/// execution context.
pub struct MemoryStorage {
    local: Arc<MemoryArea>,
    session: Arc<MemoryArea>,
    indexed: Arc<MemoryArea>,
    events: Arc<StorageEvents>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Cap the total bytes (keys plus values) held per area; writes past the
    /// cap fail with [`StorageError::QuotaExceeded`].
    pub fn with_quota(bytes: usize) -> Arc<Self> {
        Self::build(Some(bytes))
    }

    fn build(quota: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            local: MemoryArea::new(quota),
            session: MemoryArea::new(quota),
            indexed: MemoryArea::new(quota),
            events: Arc::new(StorageEvents::new()),
        })
    }

    /// Direct handle to one backing area, for inspection and pre-population.
    pub fn area(&self, kind: StorageKind) -> Arc<MemoryArea> {
        match kind {
            StorageKind::Local => Arc::clone(&self.local),
            StorageKind::Session => Arc::clone(&self.session),
            StorageKind::Indexed => Arc::clone(&self.indexed),
        }
    }

    /// Emit a change notification without touching any area, as if another
    /// tab had written (or deleted, with `None`) the key.
    pub fn broadcast(&self, key: &str, new_value: Option<&str>) {
        self.events.emit(&StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        });
    }

    /// Write to the local area and notify, simulating a complete mutation
    /// from another execution context.
    pub fn external_set(&self, key: &str, value: &str) {
        let _ = self.local.set_item(key, value);
        self.broadcast(key, Some(value));
    }
}

impl StorageProvider for MemoryStorage {
    fn is_available(&self) -> bool {
        true
    }

    fn open(&self, kind: StorageKind) -> Result<Arc<dyn StorageArea>, StorageError> {
        Ok(self.area(kind))
    }

    fn events(&self) -> Arc<StorageEvents> {
        Arc::clone(&self.events)
    }
}

/// One hash-map key/value area with an optional byte quota.
pub struct MemoryArea {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryArea {
    fn new(quota: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(HashMap::new()),
            quota,
        })
    }

    /// Remove every stored item.
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}

impl StorageArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap();
        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        let area = storage.area(StorageKind::Local);

        assert_eq!(area.get_item("k").unwrap(), None);
        area.set_item("k", "v").unwrap();
        assert_eq!(area.get_item("k").unwrap(), Some("v".to_string()));
        area.remove_item("k").unwrap();
        assert_eq!(area.get_item("k").unwrap(), None);
    }

    #[test]
    fn clear_empties_an_area() {
        let storage = MemoryStorage::new();
        let area = storage.area(StorageKind::Local);

        area.set_item("a", "1").unwrap();
        area.set_item("b", "2").unwrap();
        area.clear();

        assert_eq!(area.get_item("a").unwrap(), None);
        assert_eq!(area.get_item("b").unwrap(), None);
    }

    #[test]
    fn areas_are_independent() {
        let storage = MemoryStorage::new();
        storage
            .area(StorageKind::Local)
            .set_item("k", "local")
            .unwrap();

        assert_eq!(
            storage.area(StorageKind::Session).get_item("k").unwrap(),
            None
        );
        assert_eq!(
            storage.area(StorageKind::Indexed).get_item("k").unwrap(),
            None
        );
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let storage = MemoryStorage::with_quota(8);
        let area = storage.area(StorageKind::Local);

        area.set_item("k", "small").unwrap();
        let err = area.set_item("k", "far too large").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded));

        // The failed write left the old value in place.
        assert_eq!(area.get_item("k").unwrap(), Some("small".to_string()));
    }

    #[test]
    fn zero_quota_rejects_everything() {
        let storage = MemoryStorage::with_quota(0);
        let area = storage.area(StorageKind::Local);
        assert!(area.set_item("k", "v").is_err());
    }
}
