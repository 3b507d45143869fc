//! Cross-repository last-value propagation keyed by payload type.

mod publisher;
mod registry;
mod subscriber;

pub use publisher::Publisher;
pub use registry::RelayRegistry;
pub use subscriber::Subscriber;
