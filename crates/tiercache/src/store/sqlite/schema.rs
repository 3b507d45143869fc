//! SQL text for the JSON-row table layout and the condition translator.
//!
//! Pure functions only: table names are validated here, filter values and
//! JSON paths are always bound as parameters.

use serde_json::Value;

use tiercache_core::condition::{Condition, Direction, FilterOp};
use tiercache_core::storage::{Result, StoreError};

/// Returns `table` if it is a plain SQL identifier.
pub fn validate_table(table: &str) -> Result<&str> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(table)
    } else {
        Err(StoreError::InvalidData(format!(
            "Invalid table name: {table:?}"
        )))
    }
}

pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
             id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
             body TEXT NOT NULL\n\
         )"
    )
}

pub fn insert(table: &str) -> String {
    format!("INSERT INTO {table} (body) VALUES (?1)")
}

/// A SQL fragment with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<rusqlite::types::Value>,
}

impl Fragment {
    fn push_param(&mut self, value: rusqlite::types::Value) -> usize {
        self.params.push(value);
        self.params.len()
    }
}

/// Converts a JSON filter value into a bindable SQLite value.
///
/// Booleans become integers, matching what `json_extract` yields for JSON
/// `true` and `false`. Arrays and objects are bound as their JSON text.
pub fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;

    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

fn json_path(field: &str) -> rusqlite::types::Value {
    rusqlite::types::Value::Text(format!("$.{field}"))
}

/// `WHERE`, `ORDER BY` and `LIMIT` clauses for a condition.
///
/// Ties are broken by insertion order so results are deterministic.
pub fn clauses(condition: &Condition, with_window: bool) -> Fragment {
    let mut fragment = Fragment {
        sql: String::new(),
        params: Vec::new(),
    };

    let mut predicates = Vec::with_capacity(condition.filters.len());
    for filter in &condition.filters {
        let path = fragment.push_param(json_path(&filter.field));
        if filter.value.is_null() {
            let test = match filter.op {
                FilterOp::Eq => Some("IS NULL"),
                FilterOp::Ne => Some("IS NOT NULL"),
                _ => None,
            };
            if let Some(test) = test {
                predicates.push(format!("json_extract(body, ?{path}) {test}"));
                continue;
            }
        }
        let value = fragment.push_param(to_sql_value(&filter.value));
        predicates.push(format!(
            "json_extract(body, ?{path}) {} ?{value}",
            filter.op.as_sql()
        ));
    }
    if !predicates.is_empty() {
        fragment.sql.push_str(" WHERE ");
        fragment.sql.push_str(&predicates.join(" AND "));
    }

    if with_window {
        let mut terms = Vec::with_capacity(condition.order.len() + 1);
        for order in &condition.order {
            let path = fragment.push_param(json_path(&order.field));
            let direction = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            terms.push(format!("json_extract(body, ?{path}) {direction}"));
        }
        terms.push("id ASC".to_string());
        fragment.sql.push_str(" ORDER BY ");
        fragment.sql.push_str(&terms.join(", "));

        if let Some(window) = condition.window {
            let limit = fragment.push_param(rusqlite::types::Value::Integer(
                i64::try_from(window.limit).unwrap_or(i64::MAX),
            ));
            let offset = fragment.push_param(rusqlite::types::Value::Integer(
                i64::try_from(window.offset).unwrap_or(i64::MAX),
            ));
            fragment
                .sql
                .push_str(&format!(" LIMIT ?{limit} OFFSET ?{offset}"));
        }
    }

    fragment
}

pub fn select(table: &str, condition: &Condition) -> Fragment {
    let clauses = clauses(condition, true);
    Fragment {
        sql: format!("SELECT body FROM {table}{}", clauses.sql),
        params: clauses.params,
    }
}

pub fn count(table: &str, condition: &Condition) -> Fragment {
    let clauses = clauses(condition, false);
    Fragment {
        sql: format!("SELECT COUNT(*) FROM {table}{}", clauses.sql),
        params: clauses.params,
    }
}

/// Deletes the rows a condition selects. Windowed conditions go through an
/// id subquery since `DELETE ... LIMIT` is not available in every build.
pub fn delete(table: &str, condition: &Condition) -> Fragment {
    if condition.window.is_none() {
        let clauses = clauses(condition, false);
        return Fragment {
            sql: format!("DELETE FROM {table}{}", clauses.sql),
            params: clauses.params,
        };
    }
    let clauses = clauses(condition, true);
    Fragment {
        sql: format!(
            "DELETE FROM {table} WHERE id IN (SELECT id FROM {table}{})",
            clauses.sql
        ),
        params: clauses.params,
    }
}
