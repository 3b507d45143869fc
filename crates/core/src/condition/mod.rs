//! Query conditions: predicate + ordering + paging window.

mod error;
mod eval;
mod types;

pub use error::{ConditionError, Result};
pub use eval::{compare_values, field_value, like_matches, matches, select_indices};
pub use types::{Condition, ConditionBuilder, Direction, Filter, FilterOp, Ordering, Window};
