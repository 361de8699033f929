// tests/status_command.rs
mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::MockChat;
use stock_monitor::notify::telegram::Incoming;
use stock_monitor::notify::{ChatChannel, ExpiryQueue, MessageHandle, ParseMode};
use stock_monitor::status::{StatusResponder, EMPTY_REPORT_LINE};
use stock_monitor::{ListingRecord, Snapshot, SnapshotHandle, Tier};

fn responder(chat: Arc<MockChat>, shared: SnapshotHandle) -> StatusResponder {
    let channel: Arc<dyn ChatChannel> = chat;
    let flags: HashMap<_, _> = [("黄金区".to_string(), "🏅".to_string())].into();
    StatusResponder::new(
        channel.clone(),
        shared,
        ExpiryQueue::start(channel),
        flags,
        Duration::from_secs(60),
    )
}

fn incoming(text: &str) -> Incoming {
    Incoming {
        update_id: 1,
        handle: MessageHandle {
            chat_id: "-100".into(),
            message_id: 900,
        },
        text: text.into(),
    }
}

#[tokio::test(start_paused = true)]
async fn replies_in_the_requesting_chat_and_cleans_up_both_messages() {
    let chat = Arc::new(MockChat::default());
    let shared = SnapshotHandle::default();
    shared
        .replace(
            Snapshot::from_records([
                ListingRecord::new("黄金区", "HK", Some(2)).with_tier(Tier::level(3)),
            ]),
            Utc::now(),
        )
        .await;
    let r = responder(chat.clone(), shared);

    let reply = r.handle(&incoming("/vps"), "/vps").await.unwrap();
    {
        let sent = chat.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "-100");
        assert_eq!(sent[0].1.parse_mode, Some(ParseMode::Html));
        assert!(sent[0].1.text.contains("🏅 黄金区:"));
        assert!(sent[0].1.text.contains("    🟢 HK | 库存: 2 | 黄金会员"));
    }

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(chat.deleted.lock().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let deleted: Vec<i64> = chat.deleted.lock().iter().map(|h| h.message_id).collect();
    assert_eq!(deleted, vec![900, reply.message_id]);
}

#[tokio::test]
async fn empty_state_gets_the_waiting_notice() {
    let chat = Arc::new(MockChat::default());
    let r = responder(chat.clone(), SnapshotHandle::default());
    r.handle(&incoming("/vps@StockBot"), "/vps").await.unwrap();
    assert!(chat.texts()[0].ends_with(EMPTY_REPORT_LINE));
}

#[tokio::test]
async fn other_messages_are_ignored() {
    let chat = Arc::new(MockChat::default());
    let r = responder(chat.clone(), SnapshotHandle::default());
    assert!(r.handle(&incoming("hello"), "/vps").await.is_none());
    assert!(r.handle(&incoming("/start"), "/vps").await.is_none());
    assert_eq!(chat.sent_count(), 0);
}
