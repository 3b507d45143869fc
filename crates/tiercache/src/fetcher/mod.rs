//! Fetchers bind an upstream and a backend to one output sink and run the
//! configured strategy against them.

mod context;
mod list;
mod single;

pub(crate) use context::FetchContext;
pub use context::RelayLink;
pub use list::ListFetcher;
pub use single::SingleFetcher;
