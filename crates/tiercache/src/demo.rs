//! Simulated upstream used by the `tiercache demo` command.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use tiercache_core::condition::{Condition, Filter, FilterOp};
use tiercache_core::fetch::{NetworkError, NetworkResult, Upstream};

use crate::repository::PageCursor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub page: usize,
}

impl Article {
    pub fn new(id: u64, page: usize) -> Self {
        Self {
            id,
            title: format!("Article #{id}"),
            page,
        }
    }
}

/// Upstream generating `total` articles and serving them one page at a time.
pub struct SimulatedFeed {
    cursor: PageCursor,
    total: usize,
    latency: Duration,
    failure: Option<NetworkError>,
}

impl SimulatedFeed {
    pub fn new(cursor: PageCursor, total: usize) -> Self {
        Self {
            cursor,
            total,
            latency: Duration::from_millis(50),
            failure: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes every request fail with `error`.
    pub fn failing(mut self, error: NetworkError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Articles on the cursor's current page.
    pub fn current_page(&self) -> Vec<Article> {
        let window = self.cursor.window();
        let end = (window.offset + window.limit).min(self.total);
        (window.offset..end)
            .map(|id| Article::new(id as u64, self.cursor.page_no()))
            .collect()
    }

    async fn respond<T>(&self, value: T) -> NetworkResult<T> {
        tokio::time::sleep(self.latency).await;
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl Upstream<Article> for SimulatedFeed {
    async fn load(&self) -> Option<NetworkResult<Article>> {
        let article = self.current_page().into_iter().next()?;
        Some(self.respond(article).await)
    }

    async fn load_list(&self) -> Option<NetworkResult<Vec<Article>>> {
        Some(self.respond(self.current_page()).await)
    }

    fn query(&self) -> Condition {
        Condition {
            filters: vec![Filter {
                field: "page".to_string(),
                op: FilterOp::Eq,
                value: json!(self.cursor.page_no()),
            }],
            ..Condition::all()
        }
    }

    fn total_size(&self) -> Option<usize> {
        Some(self.total)
    }

    fn map_key(&self) -> String {
        format!("page-{}", self.cursor.page_no())
    }

    fn on_failure(&self, error: &NetworkError) {
        tracing::warn!(%error, page = self.cursor.page_no(), "Simulated feed failed");
    }
}
