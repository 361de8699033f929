//! Stock monitor binary entrypoint.
//! Boots the poll loop and the chat status listener in the background and
//! serves the read-only status/metrics router.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stock_monitor::api::{self, AppState};
use stock_monitor::config::MonitorConfig;
use stock_monitor::extract::CardExtractor;
use stock_monitor::fetch::HttpFetcher;
use stock_monitor::metrics::Metrics;
use stock_monitor::notify::{ChatChannel, ExpiryQueue, Notifier, Renderer, TelegramChannel};
use stock_monitor::poller::{PollLoop, PollSettings};
use stock_monitor::status::{self, StatusResponder};
use stock_monitor::store::{SnapshotHandle, SnapshotStore};

/// Compact logs filtered by RUST_LOG (default `stock_monitor=info,warn`).
/// The hosting runtime may already have installed a subscriber; that one wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_monitor=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn main() -> ShuttleAxum {
    // Load .env in local/dev; no-op when the variables are already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = MonitorConfig::load()?;
    let token = cfg
        .telegram_token
        .clone()
        .context("TG_TOKEN is not set")?;
    if cfg.chat_ids.is_empty() {
        tracing::warn!("TG_CHAT_IDS is empty; notifications will go nowhere");
    }

    let metrics = Metrics::init()?;

    // --- Chat side ---
    let bot = Arc::new(TelegramChannel::new(&token));
    let channel: Arc<dyn ChatChannel> = bot.clone();
    let expiry = ExpiryQueue::start(channel.clone());
    let notifier = Notifier::new(channel.clone(), cfg.chat_ids.clone(), expiry.clone())
        .with_renderer(Renderer::new(cfg.stock_change_expiry()));

    // --- State ---
    let store = SnapshotStore::new(&cfg.data_file);
    let initial = store.load().await;
    tracing::info!(
        path = %store.path().display(),
        listings = initial.len(),
        "loaded previous snapshot"
    );
    let shared = SnapshotHandle::new(initial.clone());

    // --- Poll loop ---
    let fetcher = HttpFetcher::new(&cfg.user_agent, cfg.fetch_timeout())
        .context("building catalog http client")?;
    let mut extractor = CardExtractor::new(cfg.card_selectors.clone());
    if let Some(dir) = &cfg.debug_capture_dir {
        extractor = extractor.with_capture_dir(dir);
    }
    let poll = PollLoop::new(
        PollSettings::from_config(&cfg),
        cfg.regions.clone(),
        Arc::new(fetcher),
        Arc::new(extractor),
        notifier,
        store,
        shared.clone(),
        initial,
    );
    tokio::spawn(poll.run());

    // --- Status command listener ---
    let responder = StatusResponder::new(
        channel,
        shared.clone(),
        expiry,
        cfg.region_flags(),
        cfg.status_reply_expiry(),
    );
    tokio::spawn(status::run_command_listener(
        bot,
        responder,
        cfg.status_command.clone(),
    ));

    let state = AppState::new(shared, cfg.region_flags()).with_metrics(metrics);
    let router = api::create_router(state);

    Ok(router.into())
}
