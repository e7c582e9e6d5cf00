//! Persisted reactive values: the synchronization core.
//!
//! A persisted value wraps a reactive [`Store`](crate::store::Store), loads
//! its starting content from a storage backend once, writes through on every
//! mutation, and folds in changes made by other execution contexts.

mod options;
mod persisted;

pub use options::Options;
pub use persisted::{
    indexed_state, indexed_state_with, local_state, local_state_with, session_state,
    session_state_with, state_with, Persisted, WriteError,
};
