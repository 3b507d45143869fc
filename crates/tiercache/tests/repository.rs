use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use tiercache::backend::MemoryStore;
use tiercache::store::{InMemoryStore, MemoryObjectStore, SwitchConnectivity};
use tiercache::{ConfigError, PageCursor, Repository, Streaming};
use tiercache_core::condition::Condition;
use tiercache_core::fetch::{
    FetchError, LoadEvent, LoadSource, NetworkError, NetworkResult, SyncListener, Upstream,
};
use tiercache_core::page::{DefaultPageVisitor, PagerError};
use tiercache_core::relay::{Publisher, RelayRegistry};
use tiercache_core::storage::{self, ConditionedStore};
use tiercache_core::strategy::Strategy;
use tiercache_core::{PayloadMode, PayloadType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    id: u64,
    page: usize,
}

const PAGE_LEN: u64 = 3;

fn page_items(page: usize) -> Vec<Article> {
    let first = page as u64 * 10;
    (first..first + PAGE_LEN)
        .map(|id| Article { id, page })
        .collect()
}

fn page_condition(page: usize) -> Condition {
    Condition::builder().eq("page", page).build().unwrap()
}

/// Conditioned store that records how it is used.
struct CountingStore {
    rows: InMemoryStore<Article>,
    prepares: AtomicUsize,
    selects: AtomicUsize,
    inserts: AtomicUsize,
    deletes: Mutex<Vec<Condition>>,
}

impl CountingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: InMemoryStore::new(),
            prepares: AtomicUsize::new(0),
            selects: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
        })
    }

    async fn seeded(models: Vec<Article>) -> Arc<Self> {
        let store = Self::new();
        store.rows.insert(&models).await.unwrap();
        store
    }

    fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn deleted(&self) -> Vec<Condition> {
        self.deletes.lock().unwrap().clone()
    }

    async fn stored(&self) -> usize {
        self.rows.len().await
    }
}

#[async_trait]
impl ConditionedStore<Article> for CountingStore {
    async fn prepare(&self) -> storage::Result<()> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert(&self, models: &[Article]) -> storage::Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.rows.insert(models).await
    }

    async fn delete(&self, condition: &Condition) -> storage::Result<()> {
        self.deletes.lock().unwrap().push(condition.clone());
        self.rows.delete(condition).await
    }

    async fn select(&self, condition: &Condition) -> storage::Result<Vec<Article>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.rows.select(condition).await
    }

    async fn count(&self, condition: &Condition) -> storage::Result<i64> {
        self.rows.count(condition).await
    }
}

/// What a [`Feed`] was asked to do.
#[derive(Clone, Default)]
struct Calls {
    loads: Arc<AtomicUsize>,
    failures: Arc<Mutex<Vec<NetworkError>>>,
}

impl Calls {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

/// Scripted upstream serving `page_items` for the cursor's page.
struct Feed {
    cursor: PageCursor,
    calls: Calls,
    failure: Option<NetworkError>,
    valid: bool,
    paged: bool,
    windowed: bool,
    total: Option<usize>,
}

impl Feed {
    fn new(cursor: PageCursor, calls: Calls) -> Self {
        Self {
            cursor,
            calls,
            failure: None,
            valid: true,
            paged: true,
            windowed: false,
            total: None,
        }
    }

    /// Queries by the cursor's row window instead of the page field.
    fn windowed(mut self) -> Self {
        self.windowed = true;
        self
    }

    fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    fn unpaged(mut self) -> Self {
        self.paged = false;
        self
    }

    fn failing(mut self, error: NetworkError) -> Self {
        self.failure = Some(error);
        self
    }

    fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    fn respond<T>(&self, value: T) -> NetworkResult<T> {
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl Upstream<Article> for Feed {
    async fn load(&self) -> Option<NetworkResult<Article>> {
        let article = page_items(self.cursor.page_no()).remove(0);
        Some(self.respond(article))
    }

    async fn load_list(&self) -> Option<NetworkResult<Vec<Article>>> {
        Some(self.respond(page_items(self.cursor.page_no())))
    }

    fn query(&self) -> Condition {
        if self.windowed {
            Condition {
                window: Some(self.cursor.window()),
                ..Condition::all()
            }
        } else if self.paged {
            page_condition(self.cursor.page_no())
        } else {
            Condition::all()
        }
    }

    fn check_params(&self) -> bool {
        self.valid
    }

    fn total_size(&self) -> Option<usize> {
        self.total
    }

    fn map_key(&self) -> String {
        format!("page-{}", self.cursor.page_no())
    }

    fn on_failure(&self, error: &NetworkError) {
        self.calls.failures.lock().unwrap().push(error.clone());
    }
}

type Events = mpsc::UnboundedReceiver<LoadEvent>;

fn listener() -> (Arc<mpsc::UnboundedSender<LoadEvent>>, Events) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

/// Waits for the next event from `source`, skipping the others.
async fn next_from(events: &mut Events, source: LoadSource) -> LoadEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for load event")
            .expect("listener channel closed");
        if event.source == source {
            return event;
        }
    }
}

fn drain(events: &mut Events) -> Vec<LoadEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn test_no_cache_offline_never_touches_backend() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), calls.clone()))
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .listener(tx)
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();

    assert!(sink.get().is_empty());
    assert_eq!(store.selects(), 0);
    assert_eq!(store.inserts(), 0);
    assert_eq!(calls.loads(), 0);
    assert_eq!(drain(&mut events), vec![LoadEvent::other_failure()]);
}

#[tokio::test]
async fn test_database_cache_online_reads_cache_then_network() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), calls.clone()))
        .database(store.clone())
        .listener(tx)
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();
    assert_eq!(store.selects(), 1);
    assert_eq!(next_from(&mut events, LoadSource::Cache).await, LoadEvent::cache_success());

    assert_eq!(
        next_from(&mut events, LoadSource::Network).await,
        LoadEvent::network_success()
    );
    assert_eq!(calls.loads(), 1);
    assert_eq!(sink.get(), page_items(0));
    assert_eq!(store.deleted(), vec![page_condition(0)]);
    assert_eq!(repository.cache_size().await.unwrap(), PAGE_LEN as i64);
}

#[tokio::test]
async fn test_database_cache_offline_reads_cache_only() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), calls.clone()))
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();

    assert_eq!(store.selects(), 1);
    assert_eq!(calls.loads(), 0);
    assert_eq!(sink.get(), page_items(0));
}

#[tokio::test]
async fn test_database_cache_offline_miss_empties_sink() {
    let store = CountingStore::new();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .listener(tx)
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();

    assert!(sink.get().is_empty());
    assert_eq!(
        drain(&mut events),
        vec![LoadEvent::cache_failure(), LoadEvent::other_failure()]
    );
}

#[tokio::test]
async fn test_no_network_strategy_is_exclusive() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();
    let connectivity = Arc::new(SwitchConnectivity::online());
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCacheNoNetwork)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), calls.clone()))
        .database(store.clone())
        .connectivity(connectivity.clone())
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    assert_eq!(store.selects(), 0);
    assert_eq!(calls.loads(), 1);

    connectivity.set_available(false);
    repository.fetch_list().await.unwrap();
    assert_eq!(store.selects(), 1);
    assert_eq!(calls.loads(), 1);
}

#[tokio::test]
async fn test_invalid_params_rejected_before_cache_read() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), calls.clone()).invalid())
        .database(store.clone())
        .build()
        .await
        .unwrap();

    let result = repository.fetch_list().await;

    assert!(matches!(result, Err(FetchError::InvalidQuery(_))));
    assert_eq!(store.selects(), 0);
    assert_eq!(calls.loads(), 0);
    assert!(repository.list_sink().unwrap().get().is_empty());
}

#[tokio::test]
async fn test_invalid_params_rejected_offline() {
    for strategy in [Strategy::DatabaseCache, Strategy::DatabaseCacheNoNetwork] {
        let store = CountingStore::seeded(page_items(0)).await;

        let repository = Repository::<Article>::builder()
            .strategy(strategy)
            .payload_type(PayloadType::of::<Article>())
            .upstream(Feed::new(PageCursor::default(), Calls::default()).invalid())
            .database(store.clone())
            .connectivity(Arc::new(SwitchConnectivity::offline()))
            .build()
            .await
            .unwrap();

        let result = repository.fetch_list().await;
        assert!(matches!(result, Err(FetchError::InvalidQuery(_))), "{strategy}");
        assert_eq!(store.selects(), 0, "{strategy}");
    }
}

#[tokio::test]
async fn test_invalid_params_rejected_for_single_value() {
    let store = CountingStore::seeded(page_items(0)).await;

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .list_mode(false)
        .upstream(Feed::new(PageCursor::default(), Calls::default()).invalid())
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    let result = repository.fetch().await;
    assert!(matches!(result, Err(FetchError::InvalidQuery(_))));
    assert_eq!(store.selects(), 0);
}

#[tokio::test]
async fn test_pager_over_sink() {
    let repository = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .build()
        .await
        .unwrap();

    let models: Vec<Article> = (0..10).map(|id| Article { id, page: 0 }).collect();
    repository.add_all(models, None).await.unwrap();

    let mut pager = repository.obtain_pager().unwrap();
    pager.set_page_size(3).unwrap();
    assert_eq!(pager.page_count(), 4);

    pager.set_current_page(3);
    assert_eq!(pager.accept(&DefaultPageVisitor), vec![Article { id: 9, page: 0 }]);
    assert_eq!(pager.set_page_size(0), Err(PagerError::ZeroPageSize));
}

#[tokio::test]
async fn test_page_append_with_disallow_keeps_each_page() {
    let store = CountingStore::new();
    let cursor = PageCursor::new(3).unwrap();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(cursor.clone(), Calls::default()))
        .database(store.clone())
        .page_append(true)
        .disallow_force_update(true)
        .page_cursor(cursor)
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    repository.set_current_page(1, 3).unwrap();
    let sink = repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    assert_eq!(repository.mapped_list("page-0"), Some(page_items(0)));
    assert_eq!(repository.mapped_list("page-1"), Some(page_items(1)));
    assert_eq!(sink.get(), page_items(1));
    assert!(store.deleted().is_empty());
    assert_eq!(store.stored().await, 2 * PAGE_LEN as usize);
    assert_eq!(store.rows.select(&page_condition(0)).await.unwrap(), page_items(0));
}

#[tokio::test]
async fn test_page_append_refresh_invalidates_ledgered_pages() {
    let store = CountingStore::new();
    let cursor = PageCursor::new(3).unwrap();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(cursor.clone(), Calls::default()))
        .database(store.clone())
        .page_append(true)
        .page_cursor(cursor)
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    assert_eq!(store.deleted(), vec![page_condition(0)]);

    repository.set_current_page(1, 3).unwrap();
    let sink = repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    assert_eq!(
        store.deleted(),
        vec![page_condition(0), page_condition(0), page_condition(1)]
    );
    let mut merged = page_items(0);
    merged.extend(page_items(1));
    assert_eq!(sink.get(), merged);
    assert_eq!(store.stored().await, PAGE_LEN as usize);
    assert_eq!(store.rows.select(&page_condition(1)).await.unwrap(), page_items(1));
}

#[tokio::test]
async fn test_page_append_same_page_refetch_keeps_one_copy() {
    let store = CountingStore::new();
    let cursor = PageCursor::new(3).unwrap();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(cursor.clone(), Calls::default()))
        .database(store.clone())
        .page_append(true)
        .page_cursor(cursor)
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    let sink = repository.fetch_list().await.unwrap();
    assert_eq!(next_from(&mut events, LoadSource::Cache).await, LoadEvent::cache_success());
    assert_eq!(sink.get(), page_items(0));
    assert_eq!(
        next_from(&mut events, LoadSource::Network).await,
        LoadEvent::network_success()
    );

    assert_eq!(sink.get(), page_items(0));
    assert_eq!(store.stored().await, PAGE_LEN as usize);
}

#[tokio::test]
async fn test_load_more_stops_on_last_page() {
    let cursor = PageCursor::new(3).unwrap();
    let calls = Calls::default();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(
            Feed::new(cursor.clone(), calls.clone())
                .windowed()
                .with_total(6),
        )
        .page_append(true)
        .page_cursor(cursor.clone())
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    assert_eq!(cursor.total_size(), 6);
    assert!(repository.page_cursor().can_load_more());

    let sink = repository.load_more().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    let mut both = page_items(0);
    both.extend(page_items(1));
    assert_eq!(sink.get(), both);
    assert!(cursor.is_last_page());

    repository.load_more().await.unwrap();
    assert_eq!(drain(&mut events), vec![LoadEvent::other_failure()]);
    assert_eq!(cursor.page_no(), 1);
    assert_eq!(calls.loads(), 2);
    assert_eq!(sink.get(), both);

    let sink = repository.refresh().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    assert_eq!(cursor.page_no(), 0);
    assert_eq!(sink.get(), page_items(0));
    assert_eq!(calls.loads(), 3);
}

#[tokio::test]
async fn test_page_out_of_cached_range_is_a_cache_failure() {
    let store = CountingStore::seeded(page_items(0)).await;
    let cursor = PageCursor::new(3).unwrap();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(cursor.clone(), Calls::default()).windowed())
        .database(store.clone())
        .page_append(true)
        .page_cursor(cursor.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.set_current_page(1, 3).unwrap();
    let sink = repository.fetch_list().await.unwrap();
    assert!(sink.get().is_empty());
    assert_eq!(store.selects(), 0);
    assert_eq!(cursor.total_size(), PAGE_LEN as usize);
    assert_eq!(
        drain(&mut events),
        vec![LoadEvent::cache_failure(), LoadEvent::other_failure()]
    );

    repository.set_current_page(0, 3).unwrap();
    let sink = repository.fetch_list().await.unwrap();
    assert_eq!(sink.get(), page_items(0));
    assert_eq!(store.selects(), 1);
    assert_eq!(drain(&mut events), vec![LoadEvent::cache_success()]);
}

#[tokio::test]
async fn test_relay_reaches_other_repositories() {
    let registry = RelayRegistry::new();
    let (tx, mut events) = listener();

    let build = |listener: Option<Arc<mpsc::UnboundedSender<LoadEvent>>>| {
        let registry = registry.clone();
        async move {
            let mut builder = Repository::<Article>::builder()
                .strategy(Strategy::NoCache)
                .payload_type(PayloadType::of::<Article>())
                .upstream(Feed::new(PageCursor::default(), Calls::default()))
                .notify(registry);
            if let Some(listener) = listener {
                builder = builder.listener(listener);
            }
            builder.build().await.unwrap()
        }
    };
    let sender = build(Some(tx)).await;
    let receiver = build(None).await;
    let outsider = Publisher::new();

    sender.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    let relay_key = PayloadType::of::<Article>();
    assert_eq!(receiver.relayed_list(), Some(page_items(0)));
    assert_eq!(
        registry
            .default_publisher()
            .last_value::<Vec<Article>>(relay_key),
        Some(page_items(0))
    );
    assert!(!outsider.has_value(relay_key));

    let subscriber = registry.subscriber(relay_key);
    assert_eq!(subscriber.len(), 3);
    drop(receiver);
    assert_eq!(subscriber.len(), 2);
}

#[tokio::test]
async fn test_backend_initialized_once() {
    let store = CountingStore::seeded(page_items(0)).await;

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    repository.fetch_list().await.unwrap();
    repository.fetch_list().await.unwrap();

    assert_eq!(store.prepares.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mode_mismatch() {
    let repository = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .build()
        .await
        .unwrap();

    let err = repository.fetch().await.unwrap_err();
    assert_eq!(
        err,
        FetchError::ModeMismatch {
            operation: "fetch",
            expected: PayloadMode::Single,
            actual: PayloadMode::List,
        }
    );
    assert!(repository.clear().is_err());
    assert!(repository.clear_list().is_ok());
}

#[tokio::test]
async fn test_build_rejects_misconfiguration() {
    let missing_upstream = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .build()
        .await;
    assert!(matches!(missing_upstream, Err(ConfigError::MissingUpstream)));

    let missing_backend = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .build()
        .await;
    assert!(matches!(
        missing_backend,
        Err(ConfigError::MissingBackend {
            strategy: Strategy::DatabaseCache
        })
    ));

    let missing_type = Repository::<Article>::builder()
        .strategy(Strategy::NoCache)
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .build()
        .await;
    assert!(matches!(missing_type, Err(ConfigError::MissingPayloadType)));
}

#[derive(Default)]
struct RecordingSync {
    calls: Mutex<Vec<(bool, usize)>>,
}

impl SyncListener<Article> for RecordingSync {
    fn on_sync(&self, single: bool, data: &[Article]) {
        self.calls.lock().unwrap().push((single, data.len()));
    }
}

#[tokio::test]
async fn test_add_data_appends_and_syncs() {
    let store = CountingStore::new();
    let sync = RecordingSync::default();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()).unpaged())
        .database(store.clone())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    repository
        .add_data(Article { id: 1, page: 0 }, Some(&sync))
        .await
        .unwrap();
    repository
        .add_all(page_items(2), Some(&sync))
        .await
        .unwrap();
    repository.add_all(Vec::new(), Some(&sync)).await.unwrap();

    assert_eq!(*sync.calls.lock().unwrap(), vec![(true, 1), (false, 3)]);
    assert_eq!(repository.list_sink().unwrap().get().len(), 4);
    assert_eq!(repository.cache_size().await.unwrap(), 4);
    assert_eq!(store.inserts(), 2);
}

#[tokio::test]
async fn test_clear_on_network_error() {
    let store = CountingStore::seeded(page_items(0)).await;
    let calls = Calls::default();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(
            Feed::new(PageCursor::default(), calls.clone())
                .failing(NetworkError::new(500, "upstream down")),
        )
        .database(store.clone())
        .clear_on_network_error(true)
        .listener(tx)
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();
    assert_eq!(
        next_from(&mut events, LoadSource::Network).await,
        LoadEvent::network_failure()
    );

    assert!(sink.get().is_empty());
    assert_eq!(store.deleted(), vec![page_condition(0)]);
    assert!(store.rows.is_empty().await);
    assert_eq!(
        *calls.failures.lock().unwrap(),
        vec![NetworkError::new(500, "upstream down")]
    );
}

#[tokio::test]
async fn test_network_error_keeps_stale_value_by_default() {
    let store = CountingStore::seeded(page_items(0)).await;
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(
            Feed::new(PageCursor::default(), Calls::default())
                .failing(NetworkError::new(504, "timeout")),
        )
        .database(store.clone())
        .listener(tx)
        .build()
        .await
        .unwrap();

    let sink = repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    assert_eq!(sink.get(), page_items(0));
    assert!(store.deleted().is_empty());
}

#[tokio::test]
async fn test_streaming_sink_receives_network_value() {
    let (tx, mut events) = listener();

    let repository = Repository::<Article, Streaming>::builder()
        .strategy(Strategy::NoCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .listener(tx)
        .build()
        .await
        .unwrap();

    let mut receiver = repository.list_sink().unwrap().subscribe();
    repository.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    assert!(receiver.has_changed().unwrap());
    assert_eq!(*receiver.borrow_and_update(), page_items(0));
}

#[tokio::test]
async fn test_memory_tier_serves_other_repository_offline() {
    let memory = MemoryStore::new(16);
    let (tx, mut events) = listener();

    let online = Repository::<Article>::builder()
        .strategy(Strategy::MemoryCache)
        .payload_type(PayloadType::of::<Article>())
        .list_mode(false)
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .database(CountingStore::new())
        .memory_store(memory.clone())
        .listener(tx)
        .build()
        .await
        .unwrap();
    online.fetch().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    let offline_store = CountingStore::new();
    let offline = Repository::<Article>::builder()
        .strategy(Strategy::MemoryCache)
        .payload_type(PayloadType::of::<Article>())
        .list_mode(false)
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .database(offline_store.clone())
        .memory_store(memory)
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    let sink = offline.fetch().await.unwrap();

    assert_eq!(sink.get(), Some(Article { id: 0, page: 0 }));
    assert_eq!(offline_store.selects(), 0);
}

#[tokio::test]
async fn test_single_disallow_force_update_maps_by_key() {
    let cursor = PageCursor::default();
    let (tx, mut events) = listener();

    let repository = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .list_mode(false)
        .upstream(Feed::new(cursor.clone(), Calls::default()))
        .database(CountingStore::new())
        .disallow_force_update(true)
        .page_cursor(cursor)
        .listener(tx)
        .build()
        .await
        .unwrap();

    repository.fetch().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;
    repository.set_current_page(1, 10).unwrap();
    let sink = repository.fetch().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    assert_eq!(repository.mapped("page-0"), Some(Article { id: 0, page: 0 }));
    assert_eq!(repository.mapped("page-1"), Some(Article { id: 10, page: 1 }));
    assert_eq!(sink.get(), Some(Article { id: 10, page: 1 }));
}

#[tokio::test]
async fn test_kv_backend_persists_between_repositories() {
    let objects = Arc::new(MemoryObjectStore::new(8));
    let (tx, mut events) = listener();

    let writer = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .kv(objects.clone(), || "articles".to_string())
        .listener(tx)
        .build()
        .await
        .unwrap();
    writer.fetch_list().await.unwrap();
    next_from(&mut events, LoadSource::Network).await;

    let reader = Repository::<Article>::builder()
        .strategy(Strategy::DatabaseCache)
        .payload_type(PayloadType::of::<Article>())
        .upstream(Feed::new(PageCursor::default(), Calls::default()))
        .kv(objects, || "articles".to_string())
        .connectivity(Arc::new(SwitchConnectivity::offline()))
        .build()
        .await
        .unwrap();

    assert_eq!(reader.fetch_list().await.unwrap().get(), page_items(0));
    assert_eq!(reader.cache_size().await.unwrap(), PAGE_LEN as i64);
}
