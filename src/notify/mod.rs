// src/notify/mod.rs
//! Outbound chat notifications.
//!
//! [`ChatChannel`] is the transport capability (send/delete). [`Notifier`]
//! fans one rendered [`Message`] out to every recipient and hands messages
//! with an expiry to the [`ExpiryQueue`].

pub mod expiry;
pub mod render;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::diff::TransitionEvent;
use crate::error::NotifyError;

pub use expiry::ExpiryQueue;
pub use render::Renderer;
pub use telegram::TelegramChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

/// Inline URL button attached under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub button: Option<LinkButton>,
    /// Retract the message this long after it was delivered.
    pub expire_after: Option<Duration>,
}

impl Message {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            button: None,
            expire_after: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Html),
            ..Self::plain(text)
        }
    }
}

/// Identifies a delivered message so it can be deleted later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: i64,
}

#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn send(&self, chat_id: &str, message: &Message) -> Result<MessageHandle, NotifyError>;
    async fn delete(&self, handle: &MessageHandle) -> Result<(), NotifyError>;
}

/// Per-recipient outcome of one dispatch.
#[derive(Debug)]
pub struct Delivery {
    pub chat_id: String,
    pub result: Result<MessageHandle, NotifyError>,
}

pub struct Notifier {
    channel: Arc<dyn ChatChannel>,
    recipients: Vec<String>,
    expiry: ExpiryQueue,
    renderer: Renderer,
}

impl Notifier {
    pub fn new(channel: Arc<dyn ChatChannel>, recipients: Vec<String>, expiry: ExpiryQueue) -> Self {
        Self {
            channel,
            recipients,
            expiry,
            renderer: Renderer::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Sends `message` to every recipient independently. Failures are logged
    /// and reported in the result, never raised.
    pub async fn dispatch(&self, message: &Message) -> Vec<Delivery> {
        let mut out = Vec::with_capacity(self.recipients.len());
        for chat_id in &self.recipients {
            let result = self.channel.send(chat_id, message).await;
            match &result {
                Ok(handle) => {
                    if let Some(delay) = message.expire_after {
                        self.expiry.schedule(handle.clone(), delay);
                    }
                }
                Err(e) => {
                    tracing::error!(chat_id = %chat_id, "chat delivery failed: {e:#}");
                    counter!("notify_delivery_failures_total").increment(1);
                }
            }
            out.push(Delivery {
                chat_id: chat_id.clone(),
                result,
            });
        }
        out
    }

    /// Renders and dispatches each event in order.
    pub async fn notify_events(&self, events: &[TransitionEvent]) {
        for ev in events {
            let msg = self.renderer.render(ev);
            self.dispatch(&msg).await;
        }
    }

    pub async fn alert(&self) -> Vec<Delivery> {
        self.dispatch(&render::operator_alert()).await
    }
}
