use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// One-time metric descriptions (so series show up on /metrics).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Poll cycles started.");
        describe_counter!(
            "poll_source_failures_total",
            "Sources that failed every attempt within a cycle."
        );
        describe_counter!(
            "poll_transition_events_total",
            "Stock transitions detected, by kind."
        );
        describe_gauge!(
            "poll_failure_streak",
            "Consecutive cycles in which every source failed."
        );
        describe_counter!("poll_alerts_total", "Operator alerts sent for failure streaks.");
        describe_counter!(
            "notify_delivery_failures_total",
            "Per-recipient chat deliveries that failed."
        );
        describe_counter!(
            "snapshot_persist_failures_total",
            "Snapshot writes that failed (in-memory state kept)."
        );
    });
}
