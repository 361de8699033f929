// src/poller.rs
//! The poll loop: fetch -> extract -> diff -> notify -> persist, once per
//! interval, with per-source retries and a failure-streak alert.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};

use crate::config::MonitorConfig;
use crate::diff::{self, requires_tier, TransitionEvent};
use crate::extract::{Extractor, Source};
use crate::fetch::Fetcher;
use crate::model::{ListingRecord, Snapshot};
use crate::notify::render::stock_text;
use crate::notify::Notifier;
use crate::store::{SnapshotHandle, SnapshotStore};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub fetch_attempts: u32,
    pub retry_delay: Duration,
    pub alert_threshold: u32,
    pub notify_untiered: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            fetch_attempts: 3,
            retry_delay: Duration::from_secs(2),
            alert_threshold: 10,
            notify_untiered: false,
        }
    }
}

impl PollSettings {
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        Self {
            interval: cfg.interval(),
            fetch_attempts: cfg.fetch_attempts,
            retry_delay: cfg.retry_delay(),
            alert_threshold: cfg.alert_threshold,
            notify_untiered: cfg.notify_untiered,
        }
    }
}

/// Consecutive cycles in which every source failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureStreak {
    count: u32,
}

impl FailureStreak {
    pub fn count(self) -> u32 {
        self.count
    }

    /// Folds one cycle into the streak. Returns the new streak and whether the
    /// operator alert is due; reaching `threshold` fires once and restarts at 0.
    pub fn observe(self, success_count: usize, threshold: u32) -> (FailureStreak, bool) {
        if success_count > 0 {
            return (FailureStreak::default(), false);
        }
        let count = self.count + 1;
        if count >= threshold {
            (FailureStreak::default(), true)
        } else {
            (FailureStreak { count }, false)
        }
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub successes: usize,
    pub total: usize,
    pub events: Vec<TransitionEvent>,
    pub alerted: bool,
    pub persisted: bool,
    pub failure_streak: u32,
}

pub struct PollLoop {
    settings: PollSettings,
    sources: Vec<Source>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    notifier: Notifier,
    store: SnapshotStore,
    shared: SnapshotHandle,
    previous: Snapshot,
    streak: FailureStreak,
}

impl PollLoop {
    /// `previous` is the snapshot diffed against on the first cycle, normally
    /// whatever [`SnapshotStore::load`] returned.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: PollSettings,
        sources: Vec<Source>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        notifier: Notifier,
        store: SnapshotStore,
        shared: SnapshotHandle,
        previous: Snapshot,
    ) -> Self {
        crate::metrics::describe();
        Self {
            settings,
            sources,
            fetcher,
            extractor,
            notifier,
            store,
            shared,
            previous,
            streak: FailureStreak::default(),
        }
    }

    pub fn failure_streak(&self) -> u32 {
        self.streak.count()
    }

    /// In-memory state the next cycle diffs against.
    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            sources = self.sources.len(),
            "stock monitor started"
        );
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One full cycle; never fails, every error is logged and absorbed.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        counter!("poll_cycles_total").increment(1);
        tracing::info!("checking stock...");

        let mut records: Vec<ListingRecord> = Vec::new();
        let mut succeeded: Vec<String> = Vec::new();
        for source in &self.sources {
            match self.poll_source(source).await {
                Some(mut recs) => {
                    records.append(&mut recs);
                    succeeded.push(source.region.clone());
                }
                None => {
                    counter!("poll_source_failures_total").increment(1);
                    tracing::error!(
                        region = %source.region,
                        attempts = self.settings.fetch_attempts,
                        "source failed on every attempt"
                    );
                }
            }
        }

        let total = self.sources.len();
        let successes = succeeded.len();
        tracing::info!(
            successes,
            total,
            failures = total - successes,
            "poll round finished"
        );

        let (streak, alert_due) = self
            .streak
            .observe(successes, self.settings.alert_threshold);
        self.streak = streak;
        if successes == 0 {
            tracing::warn!(
                streak = self.streak.count(),
                "every source failed this round, keeping previous snapshot"
            );
        }
        if alert_due {
            tracing::error!(
                threshold = self.settings.alert_threshold,
                "failure streak reached threshold, alerting operators"
            );
            counter!("poll_alerts_total").increment(1);
            self.notifier.alert().await;
        }
        gauge!("poll_failure_streak").set(self.streak.count() as f64);
        self.shared.set_failure_streak(self.streak.count()).await;

        let mut outcome = CycleOutcome {
            successes,
            total,
            alerted: alert_due,
            failure_streak: self.streak.count(),
            ..CycleOutcome::default()
        };
        if successes == 0 {
            return outcome;
        }

        let current = Snapshot::from_records(records);
        let untiered = self.settings.notify_untiered;
        let events = diff::diff(&self.previous, &current, |r| untiered || requires_tier(r));
        for ev in &events {
            counter!("poll_transition_events_total", "kind" => ev.kind.as_str()).increment(1);
            tracing::info!(
                kind = ev.kind.as_str(),
                region = %ev.record.region_id,
                name = %ev.record.name,
                stock = %stock_text(ev.record.stock_count),
                previous = ev.previous_stock,
                tier = ev.record.tier.label().unwrap_or("-"),
                "stock transition"
            );
        }
        self.notifier.notify_events(&events).await;

        let next = diff::merge(&self.previous, &current, &succeeded);
        outcome.persisted = match self.store.save(&next).await {
            Ok(()) => true,
            Err(e) => {
                counter!("snapshot_persist_failures_total").increment(1);
                tracing::error!("persisting snapshot failed, keeping it in memory: {e:#}");
                false
            }
        };
        log_snapshot(&next);
        self.shared.replace(next.clone(), Utc::now()).await;
        self.previous = next;
        outcome.events = events;
        outcome
    }

    /// Up to `fetch_attempts` tries of fetch + extract; the first success wins.
    async fn poll_source(&self, source: &Source) -> Option<Vec<ListingRecord>> {
        let attempts = self.settings.fetch_attempts.max(1);
        for attempt in 1..=attempts {
            let result = match self.fetcher.fetch(&source.endpoint).await {
                Ok(raw) => self.extractor.extract(&raw, source).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(recs) => {
                    tracing::info!(region = %source.region, attempt, listings = recs.len(), "request ok");
                    return Some(recs);
                }
                Err(e) => {
                    tracing::warn!(region = %source.region, attempt, "request failed: {e}");
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
        None
    }
}

fn log_snapshot(snap: &Snapshot) {
    tracing::debug!(listings = snap.len(), "current stock snapshot");
    for r in snap.records() {
        tracing::debug!(
            region = %r.region_id,
            name = %r.name,
            stock = %stock_text(r.stock_count),
            tier = r.tier.label().unwrap_or("-"),
            "snapshot entry"
        );
    }
}
