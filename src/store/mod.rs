//! Reactive containers.
//!
//! A [`Store`] holds one value and notifies registered subscribers
//! synchronously on every change. The activation seam lets external change
//! sources attach lazily, on the first subscriber, and detach with the last.

mod store;

pub use store::{Activator, Deactivate, Store, StoreSetter, Subscription};
