use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiercache::config::Config;
use tiercache::demo::{Article, SimulatedFeed};
use tiercache::store::{InMemoryStore, MemoryObjectStore, SwitchConnectivity};
use tiercache::{PageCursor, Repository};
use tiercache_core::fetch::{LoadEvent, LoadSource};
use tiercache_core::page::{DataPager, DefaultPageVisitor, RandomPageVisitor};
use tiercache_core::storage::{ConditionedStore, ObjectStore};
use tiercache_core::strategy::Strategy;
use tiercache_core::PayloadType;

/// tiercache - Tiered cache repositories over network, database and memory
#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where the demo repository keeps its cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum StoreChoice {
    /// Conditioned in-memory rows
    #[default]
    Memory,
    /// Conditioned SQLite rows at `TIERCACHE_SQLITE_PATH`
    Sqlite,
    /// Serialized values in an in-process object store
    Kv,
    /// Serialized values on the server at `TIERCACHE_REDIS_URL`
    Redis,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a repository against a simulated upstream and print its sink
    Demo {
        /// Strategy: no-cache, database-cache, memory-cache, database-cache-no-network
        #[arg(long, short, default_value = "database-cache", env = "TIERCACHE_STRATEGY")]
        strategy: Strategy,

        /// Pretend the network is unavailable
        #[arg(long)]
        offline: bool,

        /// Serve a list of articles instead of a single one
        #[arg(long)]
        list: bool,

        /// Cache storage
        #[arg(long, value_enum, default_value_t = StoreChoice::Memory)]
        store: StoreChoice,

        /// Number of pages to fetch in list mode
        #[arg(long, default_value_t = 3)]
        pages: usize,

        #[arg(long, default_value_t = 4)]
        page_size: usize,
    },
    /// Print every page of a generated collection
    Pages {
        #[arg(long, default_value_t = 10)]
        total: usize,

        #[arg(long, default_value_t = 3)]
        page_size: usize,

        /// Sample pages at random instead of slicing
        #[arg(long)]
        random: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiercache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Demo {
            strategy,
            offline,
            list,
            store,
            pages,
            page_size,
        } => run_demo(strategy, offline, list, store, pages, page_size).await,
        Command::Pages {
            total,
            page_size,
            random,
        } => print_pages(total, page_size, random),
    }
}

async fn run_demo(
    strategy: Strategy,
    offline: bool,
    list: bool,
    store: StoreChoice,
    pages: usize,
    page_size: usize,
) -> Result<()> {
    let config = Config::from_env();
    let cursor = PageCursor::new(page_size)?;
    let (tx, mut events) = mpsc::unbounded_channel::<LoadEvent>();
    let builder = Repository::<Article>::builder()
        .strategy(strategy)
        .payload_type(PayloadType::of::<Article>())
        .list_mode(list)
        .page_append(list)
        .log_print(config.log_print)
        .description("demo articles")
        .upstream(SimulatedFeed::new(cursor.clone(), pages * page_size))
        .connectivity(Arc::new(SwitchConnectivity::new(!offline)))
        .listener(Arc::new(tx))
        .page_cursor(cursor.clone());

    let key = move || format!("articles:page-{}", cursor.page_no());
    let builder = match store {
        StoreChoice::Memory => builder.database(Arc::new(InMemoryStore::new())),
        StoreChoice::Sqlite => builder.database(open_sqlite(&config.sqlite_path).await?),
        StoreChoice::Kv => {
            let objects = MemoryObjectStore::new(config.memory_capacity).with_ttl(config.cache_ttl());
            builder.kv(Arc::new(objects), key)
        }
        StoreChoice::Redis => builder.kv(open_redis(&config).await?, key),
    };
    let repository = builder.build().await?;

    tracing::info!(%strategy, offline, list, ?store, "Running demo");

    if list {
        for page in 0..pages {
            repository.set_current_page(page, page_size)?;
            let sink = repository.fetch_list().await?;
            drain_events(&mut events).await;
            let titles: Vec<String> = sink.get().into_iter().map(|a| a.title).collect();
            println!("page {page}: {} articles {titles:?}", titles.len());
        }
    } else {
        let sink = repository.fetch().await?;
        drain_events(&mut events).await;
        match sink.get() {
            Some(article) => println!("article: {} ({})", article.title, article.id),
            None => println!("article: <empty>"),
        }
    }

    println!("cached records: {}", repository.cache_size().await?);
    Ok(())
}

/// Prints load events until the network phase reports or nothing more arrives.
async fn drain_events(events: &mut mpsc::UnboundedReceiver<LoadEvent>) {
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(500), events.recv()).await {
        println!("  {event}");
        if event.source != LoadSource::Cache {
            break;
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(path: &str) -> Result<Arc<dyn ConditionedStore<Article>>> {
    let store = tiercache::store::SqliteStore::open(path, "articles").await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_path: &str) -> Result<Arc<dyn ConditionedStore<Article>>> {
    anyhow::bail!("tiercache was built without the sqlite feature")
}

#[cfg(feature = "redis")]
async fn open_redis(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    let store = tiercache::store::RedisObjectStore::new(&config.redis_url)
        .await?
        .with_prefix("tiercache:")
        .with_ttl(config.cache_ttl());
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_config: &Config) -> Result<Arc<dyn ObjectStore>> {
    anyhow::bail!("tiercache was built without the redis feature")
}

fn print_pages(total: usize, page_size: usize, random: bool) -> Result<()> {
    let mut pager = DataPager::with_page_size((0..total).collect::<Vec<_>>(), page_size)?
        .on_result(|page: &[usize]| tracing::debug!(?page, "Visited page"));

    println!("{total} items, {} pages of {page_size}", pager.page_count());
    for page in 0..pager.page_count() {
        pager.set_current_page(page);
        let items = if random {
            pager.accept(&RandomPageVisitor)
        } else {
            pager.accept(&DefaultPageVisitor)
        };
        println!("page {page}: {items:?}");
    }
    Ok(())
}
