mod error;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use serialization::{deserialize, serialize, to_document, SerializationError};
pub use traits::{BackendKind, CacheBackend};
