//! Runtime support for persisted values.
//!
//! This module provides the storage context: the backend provider in effect
//! and the registry guaranteeing one live persisted value per (kind, key).

mod context;

pub use context::StorageRuntime;
