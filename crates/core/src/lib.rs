//! Core types and contracts of the tiercache repository engine.
//!
//! Nothing in this crate performs I/O. Concrete backends, store adapters,
//! sinks and the repository itself live in the `tiercache` crate.

pub mod cache;
pub mod condition;
pub mod fetch;
pub mod page;
pub mod payload;
pub mod relay;
pub mod sink;
pub mod storage;
pub mod strategy;

pub use payload::{PayloadMode, PayloadType};
