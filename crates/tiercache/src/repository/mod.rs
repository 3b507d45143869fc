//! The public repository surface: one configured backend and fetcher pair
//! behind fetch, clear, add and paging operations.

mod builder;
mod config;
mod error;
mod page;

use std::fmt;
use std::sync::Arc;

use tiercache_core::cache::CacheBackend;
use tiercache_core::condition::{Condition, Window};
use tiercache_core::fetch::{self, FetchError, LoadEvent, SyncListener};
use tiercache_core::page::{DataPager, PagerError};
use tiercache_core::sink::{Sink, SinkKind};
use tiercache_core::{PayloadMode, PayloadType};

use crate::fetcher::{ListFetcher, RelayLink, SingleFetcher};
use crate::sink::OneShot;

pub use builder::RepositoryBuilder;
pub use config::RepositoryConfig;
pub use error::ConfigError;
pub use page::PageCursor;

/// Values a repository can serve.
pub trait Model: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Model for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

pub(crate) enum Fetcher<M: Model, K: SinkKind> {
    Single(SingleFetcher<M, K>),
    List(ListFetcher<M, K>),
}

/// A configured data repository for model `M`, publishing into sinks of
/// family `K`.
pub struct Repository<M: Model, K: SinkKind = OneShot> {
    config: RepositoryConfig,
    fetcher: Fetcher<M, K>,
    page: PageCursor,
    relay: Option<Arc<RelayLink>>,
}

impl<M: Model, K: SinkKind> Repository<M, K> {
    pub fn builder() -> RepositoryBuilder<M, K> {
        RepositoryBuilder::new()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn payload_type(&self) -> PayloadType {
        self.config.payload_type
    }

    fn single(&self, operation: &'static str) -> fetch::Result<&SingleFetcher<M, K>> {
        match &self.fetcher {
            Fetcher::Single(fetcher) => Ok(fetcher),
            Fetcher::List(_) => Err(FetchError::ModeMismatch {
                operation,
                expected: PayloadMode::Single,
                actual: self.config.mode,
            }),
        }
    }

    fn list(&self, operation: &'static str) -> fetch::Result<&ListFetcher<M, K>> {
        match &self.fetcher {
            Fetcher::List(fetcher) => Ok(fetcher),
            Fetcher::Single(_) => Err(FetchError::ModeMismatch {
                operation,
                expected: PayloadMode::List,
                actual: self.config.mode,
            }),
        }
    }

    /// Resolves the single value according to the strategy.
    ///
    /// Returns once the cache phase is done and any network request is
    /// dispatched; network results reach the sink later.
    pub async fn fetch(&self) -> fetch::Result<&K::Slot<Option<M>>> {
        self.single("fetch")?.fetch().await
    }

    pub async fn fetch_list(&self) -> fetch::Result<&K::Slot<Vec<M>>> {
        self.list("fetch_list")?.fetch().await
    }

    /// Rewinds to the first page and fetches it as the start of a new list.
    pub async fn refresh(&self) -> fetch::Result<&K::Slot<Vec<M>>> {
        let fetcher = self.list("refresh")?;
        self.page.rewind();
        fetcher.forget_pages();
        fetcher.fetch().await
    }

    /// Fetches the next page. On the last page nothing is fetched, the sink
    /// keeps its value and `(Other, Failure)` is signalled.
    pub async fn load_more(&self) -> fetch::Result<&K::Slot<Vec<M>>> {
        let fetcher = self.list("load_more")?;
        if !self.page.can_load_more() {
            tracing::debug!(
                repository = %self.config.label(),
                page = self.page.page_no(),
                total = self.page.total_size(),
                "No more pages"
            );
            fetcher.emit(LoadEvent::other_failure());
            return Ok(fetcher.sink());
        }
        self.page.advance();
        fetcher.fetch().await
    }

    /// The single-value sink, without fetching.
    pub fn sink(&self) -> fetch::Result<&K::Slot<Option<M>>> {
        Ok(self.single("sink")?.sink())
    }

    pub fn list_sink(&self) -> fetch::Result<&K::Slot<Vec<M>>> {
        Ok(self.list("list_sink")?.sink())
    }

    /// Resets the sink. Cached data is kept.
    pub fn clear(&self) -> fetch::Result<()> {
        self.single("clear")?.clear();
        Ok(())
    }

    pub fn clear_list(&self) -> fetch::Result<()> {
        self.list("clear_list")?.clear();
        Ok(())
    }

    /// Pager over the current list value.
    pub fn obtain_pager(&self) -> fetch::Result<DataPager<M>> {
        Ok(DataPager::new(self.list("obtain_pager")?.sink().current()))
    }

    /// Appends one model to the cache and the sink without a network call.
    pub async fn add_data(
        &self,
        model: M,
        sync: Option<&dyn SyncListener<M>>,
    ) -> fetch::Result<()> {
        self.add_all(vec![model], sync).await
    }

    /// Appends `models` to the cache and the sink without a network call,
    /// then tells `sync` what was added. An empty batch does nothing.
    pub async fn add_all(
        &self,
        models: Vec<M>,
        sync: Option<&dyn SyncListener<M>>,
    ) -> fetch::Result<()> {
        self.list("add_all")?.add_all(models, sync).await
    }

    /// Number of cached records for the upstream's current condition.
    pub async fn cache_size(&self) -> fetch::Result<i64> {
        let condition = self.query();
        let size = match &self.fetcher {
            Fetcher::Single(fetcher) => fetcher.backend().query_cache_size(&condition).await?,
            Fetcher::List(fetcher) => fetcher.backend().query_cache_size(&condition).await?,
        };
        Ok(size)
    }

    fn query(&self) -> Condition {
        match &self.fetcher {
            Fetcher::Single(fetcher) => fetcher.query(),
            Fetcher::List(fetcher) => fetcher.query(),
        }
    }

    pub fn set_current_page(&self, page_no: usize, page_size: usize) -> Result<(), PagerError> {
        self.page.set(page_no, page_size)
    }

    /// Row window of the current page.
    pub fn page(&self) -> Window {
        self.page.window()
    }

    pub fn page_cursor(&self) -> &PageCursor {
        &self.page
    }

    /// Value stored under a map key when force updates are disallowed.
    pub fn mapped(&self, key: &str) -> Option<M> {
        self.single("mapped").ok()?.mapped(key)
    }

    pub fn mapped_list(&self, key: &str) -> Option<Vec<M>> {
        self.list("mapped_list").ok()?.mapped(key)
    }

    /// Last single value any repository of this payload type relayed.
    pub fn relayed(&self) -> Option<M> {
        self.relay.as_ref()?.last_value()
    }

    pub fn relayed_list(&self) -> Option<Vec<M>> {
        self.relay.as_ref()?.last_value()
    }

    /// This repository's relay registration, when `notify` was configured.
    pub fn relay(&self) -> Option<&RelayLink> {
        self.relay.as_deref()
    }
}

impl<M: Model, K: SinkKind> Drop for Repository<M, K> {
    fn drop(&mut self) {
        if let Some(relay) = &self.relay {
            relay.leave();
        }
    }
}

impl<M: Model, K: SinkKind> fmt::Debug for Repository<M, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Repository");
        debug.field("config", &self.config);
        match &self.fetcher {
            Fetcher::Single(fetcher) => debug.field("fetcher", fetcher),
            Fetcher::List(fetcher) => debug.field("fetcher", fetcher),
        };
        debug.field("page", &self.page).finish()
    }
}
