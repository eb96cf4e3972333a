use std::{path::Path, process, sync::Arc, time::Instant};

use feedline::{
    application::{
        context::FeedContext,
        error::AppError,
        feed::FeedServices,
        pagination::{DEFAULT_LIMIT, Page},
        repos::{AccountsRepo, StatusesRepo},
        timeline::{PublicTimeline, TimelineConfig, TimelineManager, TimelinePage, TimelineSweeper},
    },
    cache::CacheConfig,
    config::{self, Command, FiltersArgs, HomeArgs, PageArgs, PublicArgs, Settings, SweepArgs},
    domain::types::FilterContext,
    infra::{fixture::Fixture, memory::InMemoryStore, telemetry},
};
use serde::Serialize;
use serde_json::json;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;

const HOME_LINK_BASE: &str = "http://localhost/api/v1/timelines/home";
const PUBLIC_LINK_BASE: &str = "http://localhost/api/v1/timelines/public";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Home(args) => run_home(&settings, args).await,
        Command::Public(args) => run_public(&settings, args).await,
        Command::Filters(args) => run_filters(&settings, args).await,
        Command::Sweep(args) => run_sweep(&settings, args).await,
    }
}

struct Feeds {
    store: Arc<InMemoryStore>,
    services: FeedServices,
    timelines: Arc<TimelineManager>,
    public: PublicTimeline,
}

async fn build_feeds(settings: &Settings, fixture: &Path) -> Result<Feeds, AppError> {
    let fixture = Fixture::load(fixture).await?;
    let store = Arc::new(InMemoryStore::from_fixture(fixture));

    let cache = CacheConfig::from(&settings.cache);
    let timeline = TimelineConfig::from(&settings.timeline);
    let services = FeedServices::new(store.clone(), &cache, settings.timeline.max_chain_depth);

    info!(
        target = "feedline::cli",
        accounts = store.account_ids().len(),
        boost_reinsertion_depth = timeline.boost_reinsertion_depth,
        "fixture loaded"
    );

    Ok(Feeds {
        timelines: Arc::new(TimelineManager::new(services.clone(), timeline)),
        public: PublicTimeline::new(services.clone(), &timeline),
        services,
        store,
    })
}

fn page_from(args: &PageArgs) -> Result<Page, AppError> {
    let pairs = args.query_pairs();
    Ok(Page::from_query(
        pairs.iter().map(|(key, value)| (*key, value.as_str())),
    )?)
}

fn render_page(page: &TimelinePage, base: &str) -> Result<serde_json::Value, AppError> {
    let base = Url::parse(base).map_err(|err| AppError::unexpected(err.to_string()))?;
    Ok(json!({
        "items": page.items,
        "lo": page.lo,
        "hi": page.hi,
        "link": page.link_header(&base),
    }))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn run_home(settings: &Settings, args: HomeArgs) -> Result<(), AppError> {
    let feeds = build_feeds(settings, &args.fixture.fixture).await?;
    let page = page_from(&args.page)?;

    let ctx = FeedContext::new();
    let timeline = feeds.timelines.get(&ctx, &args.account, page).await?;
    print_json(&render_page(&timeline, HOME_LINK_BASE)?)
}

async fn run_public(settings: &Settings, args: PublicArgs) -> Result<(), AppError> {
    let feeds = build_feeds(settings, &args.fixture.fixture).await?;
    let page = page_from(&args.page)?;

    let viewer = match args.account.as_deref() {
        Some(account_id) => Some(feeds.store.get_account(account_id).await?),
        None => None,
    };

    let ctx = FeedContext::new();
    let timeline = feeds
        .public
        .get(&ctx, viewer.as_ref(), page, args.local)
        .await?;
    print_json(&render_page(&timeline, PUBLIC_LINK_BASE)?)
}

async fn run_filters(settings: &Settings, args: FiltersArgs) -> Result<(), AppError> {
    let feeds = build_feeds(settings, &args.fixture.fixture).await?;
    let context: FilterContext = args.context.parse()?;
    let account = feeds.store.get_account(&args.account).await?;
    let status = feeds.store.get_status(&args.status).await?;

    let ctx = FeedContext::new();
    let (results, hidden) = feeds
        .services
        .filters
        .results_in_context(&ctx, Some(&account), &status, context)
        .await?;
    print_json(&json!({
        "status_id": status.id,
        "context": context,
        "hidden": hidden,
        "results": results,
    }))
}

async fn run_sweep(settings: &Settings, args: SweepArgs) -> Result<(), AppError> {
    let feeds = build_feeds(settings, &args.fixture.fixture).await?;

    let ctx = FeedContext::new();
    let account_ids = feeds.store.account_ids();
    for account_id in &account_ids {
        feeds
            .timelines
            .get(&ctx, account_id, Page::top(DEFAULT_LIMIT))
            .await?;
    }

    let mut indexed = serde_json::Map::new();
    for account_id in &account_ids {
        indexed.insert(
            account_id.clone(),
            json!(feeds.timelines.get_indexed_len(account_id).await),
        );
    }

    // Treat every timeline as idle for a full interval.
    let sweeper = TimelineSweeper::new(feeds.timelines.clone());
    let pruned = sweeper
        .sweep_at(Instant::now() + settings.timeline.sweep_interval)
        .await;

    print_json(&json!({
        "timelines": feeds.timelines.len(),
        "indexed_before": indexed,
        "pruned": pruned,
    }))
}
