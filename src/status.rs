// src/status.rs
//! On-demand status report.
//!
//! Reads the shared in-memory snapshot only; never touches the poll loop.
//! A chat request gets the report as a reply, and both the request and the
//! reply are retracted after a fixed delay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use html_escape::encode_text;

use crate::model::{ListingRecord, Snapshot, Tier};
use crate::notify::render::UNKNOWN_STOCK;
use crate::notify::telegram::Incoming;
use crate::notify::{ChatChannel, ExpiryQueue, Message, MessageHandle, TelegramChannel};
use crate::store::SnapshotHandle;

pub const REPORT_HEADER: &str = "🖥️ VPS库存情况：\n";
pub const REPORT_RULE: &str = "━━━━━━━━━━━━━━━━━━\n";
pub const EMPTY_REPORT_LINE: &str = "📦 暂无库存数据，请等待下一次监控刷新。";
pub const DEFAULT_REGION_FLAG: &str = "🌍";
pub const UNTIERED_LABEL: &str = "月费服务";

/// Gap between retracting the request and retracting the reply.
const REPLY_DELETE_LAG: Duration = Duration::from_millis(500);

/// Status glyph and stock text for one listing.
pub fn stock_status(stock: Option<u32>) -> (&'static str, String) {
    match stock {
        None => ("🟡", UNKNOWN_STOCK.to_string()),
        Some(0) => ("🔴", "0".to_string()),
        Some(n) => ("🟢", n.to_string()),
    }
}

fn tier_label(tier: Tier) -> &'static str {
    tier.label().unwrap_or(UNTIERED_LABEL)
}

fn listing_line(r: &ListingRecord) -> String {
    let (glyph, stock) = stock_status(r.stock_count);
    format!(
        "    {glyph} {} | 库存: {stock} | {}",
        encode_text(&r.name),
        tier_label(r.tier)
    )
}

/// Renders the report grouped by region, regions in snapshot order.
pub fn render_report(snapshot: &Snapshot, flags: &HashMap<String, String>) -> String {
    let mut lines: Vec<String> = Vec::new();
    if snapshot.is_empty() {
        lines.push(EMPTY_REPORT_LINE.to_string());
    } else {
        for (region, listings) in snapshot.regions() {
            let flag = flags
                .get(region)
                .map(String::as_str)
                .unwrap_or(DEFAULT_REGION_FLAG);
            lines.push(format!("{flag} {}:", encode_text(region)));
            lines.extend(listings.iter().map(listing_line));
            lines.push(String::new());
        }
    }
    format!("{REPORT_HEADER}{REPORT_RULE}{}", lines.join("\n"))
}

/// True for `/vps`, `/vps@SomeBot` and `/vps anything`.
pub fn is_status_command(text: &str, command: &str) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };
    let head = first.split('@').next().unwrap_or(first);
    head == command
}

#[derive(Clone)]
pub struct StatusResponder {
    channel: Arc<dyn ChatChannel>,
    snapshot: SnapshotHandle,
    expiry: ExpiryQueue,
    flags: Arc<HashMap<String, String>>,
    reply_ttl: Duration,
}

impl StatusResponder {
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        snapshot: SnapshotHandle,
        expiry: ExpiryQueue,
        flags: HashMap<String, String>,
        reply_ttl: Duration,
    ) -> Self {
        Self {
            channel,
            snapshot,
            expiry,
            flags: Arc::new(flags),
            reply_ttl,
        }
    }

    pub async fn report(&self) -> String {
        let snap = self.snapshot.snapshot().await;
        render_report(&snap, &self.flags)
    }

    /// Replies to `request` in the same chat and schedules both for deletion.
    pub async fn respond(&self, request: &MessageHandle) -> Option<MessageHandle> {
        let msg = Message::html(self.report().await);
        self.expiry.schedule(request.clone(), self.reply_ttl);
        match self.channel.send(&request.chat_id, &msg).await {
            Ok(reply) => {
                self.expiry
                    .schedule(reply.clone(), self.reply_ttl + REPLY_DELETE_LAG);
                Some(reply)
            }
            Err(e) => {
                tracing::error!(chat_id = %request.chat_id, "status reply failed: {e:#}");
                None
            }
        }
    }

    pub async fn handle(&self, incoming: &Incoming, command: &str) -> Option<MessageHandle> {
        if !is_status_command(&incoming.text, command) {
            return None;
        }
        tracing::info!(chat_id = %incoming.handle.chat_id, "status requested");
        self.respond(&incoming.handle).await
    }
}

/// Long-polls the bot for status commands until the task is dropped.
pub async fn run_command_listener(bot: Arc<TelegramChannel>, responder: StatusResponder, command: String) {
    let mut offset: i64 = 0;
    loop {
        match bot.updates(offset).await {
            Ok(batch) => {
                for incoming in batch {
                    offset = offset.max(incoming.update_id + 1);
                    responder.handle(&incoming, &command).await;
                }
            }
            Err(e) => {
                tracing::warn!("status listener poll failed: {e:#}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
