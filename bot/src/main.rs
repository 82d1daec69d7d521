use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use common::logger::init_logger;
use common::shutdown::{self, listen_for_shutdown};
use market::source::coinbase::CoinbaseClient;
use market::{AssetBook, PriceSource};
use pricebot::{
    commands::CommandHandler,
    config::AppConfig,
    error::AppError,
    on_demand::{OnDemandRequest, OnDemandWorker},
    poller::PricePoller,
    telegram::{TelegramClient, updates::run_update_loop},
};
use scheduler::{BroadcastGate, BroadcastScheduler, MessagingTransport, SchedulerConfig};
use subscribers::store::SqliteKvStore;
use subscribers::{KvStore, SubscriberRegistry};

const CHATS_NAMESPACE: &str = "chats";
const USERS_NAMESPACE: &str = "users";
const MIN_HOURS_BETWEEN_BROADCASTS: f64 = 23.0;
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Connects the durable store and loads both registries and the gate.
async fn init_store(
    cfg: &AppConfig,
) -> Result<
    (
        Arc<SubscriberRegistry>,
        Arc<SubscriberRegistry>,
        Arc<BroadcastGate>,
    ),
    AppError,
> {
    let store: Arc<dyn KvStore> = Arc::new(
        SqliteKvStore::connect(&cfg.database_url)
            .await
            .map_err(AppError::StoreUnavailable)?,
    );

    let chats = SubscriberRegistry::load(CHATS_NAMESPACE, Arc::clone(&store))
        .await
        .map_err(AppError::StoreUnavailable)?;
    let users = SubscriberRegistry::load(USERS_NAMESPACE, Arc::clone(&store))
        .await
        .map_err(AppError::StoreUnavailable)?;
    let gate = BroadcastGate::load(store)
        .await
        .map_err(AppError::StoreUnavailable)?;

    tracing::info!(
        chats = chats.len().await,
        users = users.len().await,
        last_sent_at = ?gate.last_sent_at().await,
        "state restored"
    );

    Ok((Arc::new(chats), Arc::new(users), Arc::new(gate)))
}

/// Starts the on-demand worker and returns its request queue.
fn start_on_demand_worker(
    source: Arc<dyn PriceSource>,
    book: Arc<AssetBook>,
    scheduler: Arc<BroadcastScheduler>,
    cfg: &AppConfig,
    shutdown: shutdown::Shutdown,
) -> (mpsc::Sender<OnDemandRequest>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<OnDemandRequest>(cfg.on_demand_queue.max(1));
    let worker = OnDemandWorker::new(source, book, scheduler);
    let handle = tokio::spawn(worker.run(rx, shutdown));
    (tx, handle)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_logger("pricebot", cfg.production);

    tracing::info!(
        assets = ?cfg.assets.iter().map(|a| a.id()).collect::<Vec<_>>(),
        send_hour = cfg.send_hour,
        "starting price broadcaster"
    );

    let (chats, users, gate) = init_store(&cfg).await?;

    let book = Arc::new(AssetBook::new(cfg.assets.clone(), cfg.window_capacity));

    let source: Arc<dyn PriceSource> = Arc::new(
        CoinbaseClient::new(cfg.price_api_url.clone(), cfg.fetch_timeout).map_err(AppError::from)?,
    );

    let telegram = TelegramClient::new(&cfg.telegram_api_url, &cfg.telegram_token, SEND_TIMEOUT)
        .map_err(AppError::from)?;
    let transport: Arc<dyn MessagingTransport> = Arc::new(telegram.clone());

    let scheduler = Arc::new(BroadcastScheduler::new(
        SchedulerConfig {
            target_hour: cfg.send_hour,
            min_hours_between: MIN_HOURS_BETWEEN_BROADCASTS,
            delivery_concurrency: cfg.delivery_concurrency,
        },
        gate,
        Arc::clone(&chats),
        Arc::clone(&book),
        transport,
    ));

    let (trigger, shutdown) = shutdown::channel();

    let (on_demand_tx, on_demand) = start_on_demand_worker(
        Arc::clone(&source),
        Arc::clone(&book),
        Arc::clone(&scheduler),
        &cfg,
        shutdown.clone(),
    );

    let poller = PricePoller::new(
        source,
        Arc::clone(&book),
        Arc::clone(&scheduler),
        cfg.poll_interval,
    );
    let poll = tokio::spawn(poller.run(shutdown.clone()));

    let handler = Arc::new(CommandHandler::new(
        chats,
        users,
        book,
        scheduler,
        on_demand_tx,
        cfg.admin_ids.clone(),
    ));
    let updates = tokio::spawn(run_update_loop(
        telegram,
        handler,
        cfg.long_poll_timeout,
        shutdown,
    ));

    listen_for_shutdown(trigger).await;
    tracing::info!("shutdown signal received");

    for (name, handle) in [("poller", poll), ("updates", updates), ("on_demand", on_demand)] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "task ended abnormally");
        }
    }

    tracing::info!("price broadcaster stopped");
    Ok(())
}
