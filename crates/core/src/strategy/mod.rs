//! Strategy selection: which tiers are read, in which order, and whether the
//! network is consulted.

mod select;
mod source;
mod types;

pub use select::{select_data, Selection};
pub use source::DataSource;
pub use types::{ParseStrategyError, Provenance, Strategy};
