//! Pure evaluation of conditions against JSON documents.
//!
//! Stores that keep their rows in memory use these functions to apply the
//! same predicate, ordering and window semantics the SQL adapter expresses
//! in SQL.

use std::cmp::Ordering as CmpOrdering;

use serde_json::Value;

use super::{Condition, Direction, Filter, FilterOp};

/// Resolves a dotted field path (`"author.name"`) inside a document.
///
/// Missing fields resolve to `Value::Null`.
pub fn field_value<'a>(document: &'a Value, field: &str) -> &'a Value {
    let mut current = document;
    for segment in field.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return &Value::Null,
        }
    }
    current
}

/// Compares two JSON scalars.
///
/// Numbers compare numerically, strings lexicographically, booleans
/// false < true. Mixed or compound types are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<CmpOrdering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(CmpOrdering::Equal),
        _ => None,
    }
}

/// Checks whether `text` matches an SQL `LIKE` pattern.
///
/// `%` matches any sequence of characters (including none) and `_` matches
/// exactly one character.
///
/// # Examples
///
/// ```
/// use tiercache_core::condition::like_matches;
///
/// assert!(like_matches("user:%", "user:123"));
/// assert!(like_matches("a_c", "abc"));
/// assert!(!like_matches("a_c", "abbc"));
/// ```
pub fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `%` seen and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '%' {
        p += 1;
    }
    p == pattern.len()
}

fn filter_matches(filter: &Filter, document: &Value) -> bool {
    let actual = field_value(document, &filter.field);
    match filter.op {
        FilterOp::Eq => actual == &filter.value,
        FilterOp::Ne => actual != &filter.value,
        FilterOp::Lt => compare_values(actual, &filter.value) == Some(CmpOrdering::Less),
        FilterOp::Le => matches!(
            compare_values(actual, &filter.value),
            Some(CmpOrdering::Less | CmpOrdering::Equal)
        ),
        FilterOp::Gt => compare_values(actual, &filter.value) == Some(CmpOrdering::Greater),
        FilterOp::Ge => matches!(
            compare_values(actual, &filter.value),
            Some(CmpOrdering::Greater | CmpOrdering::Equal)
        ),
        FilterOp::Like => match (actual, &filter.value) {
            (Value::String(text), Value::String(pattern)) => like_matches(pattern, text),
            _ => false,
        },
    }
}

/// Returns true when the document satisfies every filter of the condition.
pub fn matches(condition: &Condition, document: &Value) -> bool {
    condition.filters.iter().all(|f| filter_matches(f, document))
}

/// Applies a condition to a slice of documents and returns the indices of
/// the selected rows, in result order.
///
/// Rows are filtered, then stably sorted by the ordering terms (insertion
/// order breaks ties), then windowed.
pub fn select_indices(condition: &Condition, documents: &[Value]) -> Vec<usize> {
    let mut selected: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(_, doc)| matches(condition, doc))
        .map(|(i, _)| i)
        .collect();

    if !condition.order.is_empty() {
        selected.sort_by(|&a, &b| {
            for term in &condition.order {
                let left = field_value(&documents[a], &term.field);
                let right = field_value(&documents[b], &term.field);
                let ord = compare_values(left, right).unwrap_or(CmpOrdering::Equal);
                let ord = match term.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != CmpOrdering::Equal {
                    return ord;
                }
            }
            CmpOrdering::Equal
        });
    }

    match condition.window {
        Some(window) => selected
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect(),
        None => selected,
    }
}
