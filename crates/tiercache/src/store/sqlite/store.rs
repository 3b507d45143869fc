//! SQLite conditioned store.
//!
//! Each model is stored as one JSON row; conditions are evaluated with
//! `json_extract` against that document.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio_rusqlite::Connection;

use tiercache_core::condition::Condition;
use tiercache_core::storage::{ConditionedStore, Result, StoreError};

use super::error::map_tokio_rusqlite_error;
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-backed store for models of type `M`, one table per store.
///
/// The connection is cheap to clone, so several stores (one per model type)
/// can share a database file through [`SqliteStore::with_connection`].
pub struct SqliteStore<M> {
    conn: Connection,
    table: String,
    _model: PhantomData<fn() -> M>,
}

impl<M> SqliteStore<M> {
    /// Opens (or creates) a file-based database.
    pub async fn open(path: &str, table: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn, table)
    }

    /// Opens an in-memory database. Data is lost when the connection is dropped.
    pub async fn open_in_memory(table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn, table)
    }

    pub fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        let table = schema::validate_table(table)?.to_string();
        Ok(Self {
            conn,
            table,
            _model: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl<M> ConditionedStore<M> for SqliteStore<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn prepare(&self) -> Result<()> {
        let sql = schema::create_table(&self.table);
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql).map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.table))?;
        tracing::debug!(table = %self.table, "SQLite table ready");
        Ok(())
    }

    async fn insert(&self, models: &[M]) -> Result<()> {
        if models.is_empty() {
            return Ok(());
        }
        let bodies = models
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let sql = schema::insert(&self.table);
        let rows = bodies.len();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                {
                    let mut stmt = tx.prepare(&sql).map_err(wrap_err)?;
                    for body in &bodies {
                        stmt.execute([body]).map_err(wrap_err)?;
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.table))?;

        tracing::trace!(table = %self.table, rows, "Inserted rows");
        Ok(())
    }

    async fn delete(&self, condition: &Condition) -> Result<()> {
        let fragment = schema::delete(&self.table, condition);

        let removed = self
            .conn
            .call(move |conn| {
                conn.execute(
                    &fragment.sql,
                    rusqlite::params_from_iter(fragment.params.iter()),
                )
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.table))?;

        tracing::trace!(table = %self.table, removed, "Deleted rows");
        Ok(())
    }

    async fn select(&self, condition: &Condition) -> Result<Vec<M>> {
        let fragment = schema::select(&self.table, condition);

        let bodies = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&fragment.sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(fragment.params.iter()), |row| {
                        row.get::<_, String>(0)
                    })
                    .map_err(wrap_err)?;

                let mut bodies = Vec::new();
                for row_result in rows {
                    bodies.push(row_result.map_err(wrap_err)?);
                }
                Ok(bodies)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.table))?;

        bodies
            .iter()
            .map(|body| {
                serde_json::from_str(body).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    async fn count(&self, condition: &Condition) -> Result<i64> {
        let fragment = schema::count(&self.table, condition);

        self.conn
            .call(move |conn| {
                conn.query_row(
                    &fragment.sql,
                    rusqlite::params_from_iter(fragment.params.iter()),
                    |row| row.get::<_, i64>(0),
                )
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.table))
    }
}
