use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConditionError, Result};

/// Comparison operator of a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// SQL-style `LIKE` with `%` matching any sequence and `_` one character.
    Like,
}

impl FilterOp {
    /// Returns the SQL operator for this filter.
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Like => "LIKE",
        }
    }
}

/// A single `field <op> value` clause. Clauses of a condition are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// A single ordering term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    /// Parses `"+field"` (ascending) or `"-field"` (descending).
    ///
    /// ```
    /// use tiercache_core::condition::{Direction, Ordering};
    ///
    /// let order = Ordering::parse("-created_at").unwrap();
    /// assert_eq!(order.field, "created_at");
    /// assert_eq!(order.direction, Direction::Desc);
    ///
    /// assert!(Ordering::parse("created_at").is_err());
    /// ```
    pub fn parse(expr: &str) -> Result<Self> {
        let direction = match expr.chars().next() {
            Some('+') => Direction::Asc,
            Some('-') => Direction::Desc,
            Some(_) => return Err(ConditionError::InvalidOrdering(expr.to_string())),
            None => return Err(ConditionError::EmptyOrdering),
        };
        let field = &expr[1..];
        if field.is_empty() {
            return Err(ConditionError::EmptyOrdering);
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Paging window: skip `offset` rows, return at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Window covering page `page_no` (0-based) of `page_size` rows.
    pub fn page(page_no: usize, page_size: usize) -> Self {
        Self {
            offset: page_no * page_size,
            limit: page_size,
        }
    }
}

/// Predicate + ordering + paging descriptor scoping a cache query or removal.
///
/// The empty condition ([`Condition::all`]) selects every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub filters: Vec<Filter>,
    pub order: Vec<Ordering>,
    pub window: Option<Window>,
}

impl Condition {
    /// The condition matching everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Starts a [`ConditionBuilder`].
    pub fn builder() -> ConditionBuilder {
        ConditionBuilder::default()
    }

    /// Returns a copy of this condition scoped to the given window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Returns a copy of this condition without ordering or window, which is
    /// what counting and bulk removal look at.
    pub fn predicate_only(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            order: Vec::new(),
            window: None,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Fluent builder for [`Condition`].
#[derive(Debug, Default)]
pub struct ConditionBuilder {
    condition: Condition,
    error: Option<ConditionError>,
}

impl ConditionBuilder {
    /// Adds a `field <op> value` clause.
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.condition.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality clause.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Adds an ordering term in `"+field"` / `"-field"` form.
    pub fn order_by(mut self, expr: &str) -> Self {
        match Ordering::parse(expr) {
            Ok(ordering) => self.condition.order.push(ordering),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Sets the paging window.
    pub fn limit(mut self, offset: usize, limit: usize) -> Self {
        self.condition.window = Some(Window::new(offset, limit));
        self
    }

    /// Sets the paging window from a page number and size.
    pub fn page(mut self, page_no: usize, page_size: usize) -> Self {
        self.condition.window = Some(Window::page(page_no, page_size));
        self
    }

    /// Finishes the builder, surfacing the first ordering error if any.
    pub fn build(self) -> Result<Condition> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.condition),
        }
    }
}
