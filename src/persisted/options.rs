use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::serializer::{Json, Serializer, SerializerError};

use super::persisted::WriteError;

pub(crate) type WriteErrorHook = Arc<dyn Fn(&WriteError) + Send + Sync>;
pub(crate) type ParseErrorHook = Arc<dyn Fn(&str, &SerializerError) + Send + Sync>;
pub(crate) type Transform<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

/// Tuning knobs for a persisted value.
///
/// `Options::default()` uses the [`Json`] serializer and so requires serde
/// impls on the value type; [`Options::with_serializer`] carries no such
/// bound. Remaining fields are builder-style.
pub struct Options<T> {
    pub(crate) serializer: Arc<dyn Serializer<T>>,
    pub(crate) sync_tabs: bool,
    pub(crate) on_write_error: Option<WriteErrorHook>,
    pub(crate) on_parse_error: Option<ParseErrorHook>,
    pub(crate) before_read: Option<Transform<T>>,
    pub(crate) before_write: Option<Transform<T>>,
}

impl<T> Options<T> {
    /// Options around a custom serializer.
    pub fn with_serializer(serializer: impl Serializer<T> + 'static) -> Self {
        Self {
            serializer: Arc::new(serializer),
            sync_tabs: true,
            on_write_error: None,
            on_parse_error: None,
            before_read: None,
            before_write: None,
        }
    }

    /// Enable or disable cross-tab synchronization (default enabled;
    /// meaningful for the local kind only).
    pub fn sync_tabs(mut self, enabled: bool) -> Self {
        self.sync_tabs = enabled;
        self
    }

    /// Called once per failed write-through; the in-memory value is updated
    /// regardless. Default: log at error level.
    pub fn on_write_error(mut self, hook: impl Fn(&WriteError) + Send + Sync + 'static) -> Self {
        self.on_write_error = Some(Arc::new(hook));
        self
    }

    /// Called with the raw stored text and the cause when it fails to parse,
    /// on initial load or on a cross-tab event. Default: log at error level.
    pub fn on_parse_error(
        mut self,
        hook: impl Fn(&str, &SerializerError) + Send + Sync + 'static,
    ) -> Self {
        self.on_parse_error = Some(Arc::new(hook));
        self
    }

    /// Transform applied to values read back from storage (initial load and
    /// cross-tab events) before they enter the store.
    pub fn before_read(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.before_read = Some(Arc::new(f));
        self
    }

    /// Transform applied to values on their way into storage. The in-memory
    /// value subscribers observe stays untransformed.
    pub fn before_write(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.before_write = Some(Arc::new(f));
        self
    }
}

impl<T> Default for Options<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn default() -> Self {
        Self::with_serializer(Json)
    }
}
