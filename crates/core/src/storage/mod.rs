//! Contracts of the external collaborators the engine consumes.

mod error;
mod traits;

pub use error::{Result, StoreError};
pub use traits::{ConditionedStore, Connectivity, ObjectStore};
