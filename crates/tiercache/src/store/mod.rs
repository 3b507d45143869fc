//! Reference adapters for the collaborator contracts in
//! `tiercache_core::storage`.
//!
//! # Feature Flags
//!
//! - `sqlite` (default): `SqliteStore` using `rusqlite` and `tokio-rusqlite`
//! - `redis`: `RedisObjectStore` using the redis crate

mod connectivity;
mod inmemory;
mod memory_object;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use connectivity::SwitchConnectivity;
pub use inmemory::InMemoryStore;
pub use memory_object::MemoryObjectStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisObjectStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
