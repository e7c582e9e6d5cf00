//! Pluggable value serialization.
//!
//! Persisted values travel to and from storage as strings. The [`Serializer`]
//! trait is the conversion seam; [`Json`] is the default implementation.

mod json;

pub use json::{Json, Serializer, SerializerError};
