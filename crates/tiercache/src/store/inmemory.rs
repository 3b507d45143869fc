//! In-memory conditioned store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use tiercache_core::cache::to_document;
use tiercache_core::condition::{select_indices, Condition};
use tiercache_core::storage::{ConditionedStore, Result, StoreError};

/// A stored model alongside the JSON document conditions are evaluated against.
#[derive(Debug, Clone)]
struct Row<M> {
    model: M,
    document: Value,
}

/// Conditioned store backed by a vector.
///
/// Rows keep insertion order, which is also the tie-break order when a
/// condition sorts on equal values. Data is lost when the store is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryStore<M> {
    rows: Arc<RwLock<Vec<Row<M>>>>,
}

impl<M> Default for InMemoryStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> InMemoryStore<M> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn documents<M>(rows: &[Row<M>]) -> Vec<Value> {
    rows.iter().map(|row| row.document.clone()).collect()
}

#[async_trait]
impl<M> ConditionedStore<M> for InMemoryStore<M>
where
    M: Serialize + Clone + Send + Sync + 'static,
{
    async fn insert(&self, models: &[M]) -> Result<()> {
        let mut new_rows = Vec::with_capacity(models.len());
        for model in models {
            let document =
                to_document(model).map_err(|e| StoreError::Serialization(e.to_string()))?;
            new_rows.push(Row {
                model: model.clone(),
                document,
            });
        }
        self.rows.write().await.extend(new_rows);
        Ok(())
    }

    async fn delete(&self, condition: &Condition) -> Result<()> {
        let mut rows = self.rows.write().await;
        let mut doomed = select_indices(condition, &documents(&rows));
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for index in doomed {
            rows.remove(index);
        }
        Ok(())
    }

    async fn select(&self, condition: &Condition) -> Result<Vec<M>> {
        let rows = self.rows.read().await;
        Ok(select_indices(condition, &documents(&rows))
            .into_iter()
            .map(|index| rows[index].model.clone())
            .collect())
    }

    async fn count(&self, condition: &Condition) -> Result<i64> {
        let rows = self.rows.read().await;
        let matched = select_indices(&condition.predicate_only(), &documents(&rows)).len();
        Ok(matched as i64)
    }
}
