//! Concrete cache backends implementing `tiercache_core::cache::CacheBackend`.

mod database;
mod empty;
mod kv;
mod list;
mod memory;

pub use database::{DatabaseBackend, ListDatabaseBackend};
pub use empty::EmptyBackend;
pub use kv::{KeyProvider, KvBackend};
pub use list::{Ledger, ListBackend};
pub use memory::{MemoryBackend, MemoryStore};
