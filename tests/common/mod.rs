// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use stock_monitor::error::{FetchError, NotifyError};
use stock_monitor::fetch::Fetcher;
use stock_monitor::notify::{ChatChannel, Message, MessageHandle};

/// Chat double: records sends and deletes, can refuse chosen recipients.
#[derive(Default)]
pub struct MockChat {
    pub sent: Mutex<Vec<(String, Message)>>,
    pub deleted: Mutex<Vec<MessageHandle>>,
    pub refuse: HashSet<String>,
    next_id: AtomicI64,
}

impl MockChat {
    pub fn refusing(ids: &[&str]) -> Self {
        Self {
            refuse: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, m)| m.text.clone()).collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl ChatChannel for MockChat {
    async fn send(&self, chat_id: &str, message: &Message) -> Result<MessageHandle, NotifyError> {
        if self.refuse.contains(chat_id) {
            return Err(NotifyError::Api {
                method: "sendMessage",
                description: "Forbidden: bot was blocked by the user".into(),
            });
        }
        self.sent.lock().push((chat_id.to_string(), message.clone()));
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), NotifyError> {
        self.deleted.lock().push(handle.clone());
        Ok(())
    }
}

/// Fetcher double. Each endpoint has a script of responses (`None` = failure);
/// the last entry repeats once the script runs out. Unknown endpoints fail.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Vec<Option<String>>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn set(&self, endpoint: &str, script: Vec<Option<String>>) {
        self.scripts.lock().insert(endpoint.to_string(), script);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<String, FetchError> {
        self.calls.lock().push(endpoint.to_string());
        let mut scripts = self.scripts.lock();
        let next = match scripts.get_mut(endpoint) {
            Some(s) if s.len() > 1 => s.remove(0),
            Some(s) => s.first().cloned().flatten(),
            None => None,
        };
        next.ok_or_else(|| FetchError::Other(format!("scripted failure for {endpoint}")))
    }
}

/// A cart page in the storefront's markup. Every card requires 黄金会员.
pub fn page(items: &[(&str, u32)]) -> String {
    let cards: String = items
        .iter()
        .map(|(name, stock)| {
            format!(
                r#"<div class="card cartitem">
                     <h4>{name}</h4>
                     <ul class="vps-config"><li>2 vCPU</li><li>黄金会员</li></ul>
                     <p class="card-text">库存：{stock}</p>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body>{cards}</body></html>")
}
