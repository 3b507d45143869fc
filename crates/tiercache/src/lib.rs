//! Tiered cache repositories.
//!
//! A [`Repository`] resolves data from the network, a persistent backend and
//! an optional memory tier according to its [`Strategy`], publishing results
//! into an observable sink.
//!
//! [`Strategy`]: tiercache_core::strategy::Strategy

pub mod backend;
pub mod config;
pub mod demo;
pub mod fetcher;
pub mod repository;
pub mod sink;
pub mod store;

pub use repository::{
    ConfigError, Model, PageCursor, Repository, RepositoryBuilder, RepositoryConfig,
};
pub use sink::{LatestValue, OneShot, StreamSlot, Streaming};
