use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Failure produced by a [`Serializer`] in either direction.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Failure reported by a user-supplied serializer.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// A pair of functions converting a value to and from its stored string form.
///
/// The default is [`Json`]; supply a custom implementation for value types
/// with no natural JSON form (for example a set persisted as a delimited
/// list).
pub trait Serializer<T>: Send + Sync {
    fn stringify(&self, value: &T) -> Result<String, SerializerError>;
    fn parse(&self, text: &str) -> Result<T, SerializerError>;
}

/// The default serializer: JSON via serde.
pub struct Json;

impl<T> Serializer<T> for Json
where
    T: Serialize + DeserializeOwned,
{
    fn stringify(&self, value: &T) -> Result<String, SerializerError> {
        Ok(serde_json::to_string(value)?)
    }

    fn parse(&self, text: &str) -> Result<T, SerializerError> {
        Ok(serde_json::from_str(text)?)
    }
}
