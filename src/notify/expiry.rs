// src/notify/expiry.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use super::{ChatChannel, MessageHandle};

#[derive(Debug)]
struct PendingDelete {
    handle: MessageHandle,
    due: Instant,
}

/// Deferred message retraction. Each scheduled deletion runs on its own once
/// due; a failed delete is logged and dropped. Nothing here is ever awaited
/// by the poll cycle.
#[derive(Clone)]
pub struct ExpiryQueue {
    tx: mpsc::UnboundedSender<PendingDelete>,
}

impl ExpiryQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(channel: Arc<dyn ChatChannel>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingDelete>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let channel = channel.clone();
                tokio::spawn(async move {
                    time::sleep_until(job.due).await;
                    if let Err(e) = channel.delete(&job.handle).await {
                        tracing::warn!(
                            chat_id = %job.handle.chat_id,
                            message_id = job.handle.message_id,
                            "expired message not deleted: {e:#}"
                        );
                    }
                });
            }
            tracing::debug!("expiry queue closed");
        });
        Self { tx }
    }

    pub fn schedule(&self, handle: MessageHandle, delay: Duration) {
        let job = PendingDelete {
            handle,
            due: Instant::now() + delay,
        };
        if self.tx.send(job).is_err() {
            tracing::debug!("expiry worker gone, deletion dropped");
        }
    }
}
