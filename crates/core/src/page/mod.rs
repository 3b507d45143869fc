//! Stateless paging over in-memory collections.

mod error;
mod pager;
mod visitor;

pub use error::{PagerError, Result};
pub use pager::DataPager;
pub use visitor::{DefaultPageVisitor, PageVisitor, RandomPageVisitor};
