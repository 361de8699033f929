use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{ChatChannel, Message, MessageHandle, ParseMode};
use crate::error::NotifyError;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Long-poll wait passed to `getUpdates`.
const UPDATES_WAIT_SECS: u64 = 30;

/// Telegram Bot API transport.
#[derive(Clone)]
pub struct TelegramChannel {
    base: String,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

/// A text message someone sent to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub update_id: i64,
    pub handle: MessageHandle,
    pub text: String,
}

impl TelegramChannel {
    pub fn new(token: &str) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, token)
    }

    /// Point at a different Bot API host (self-hosted server or a test double).
    pub fn with_api_base(api_base: &str, token: &str) -> Self {
        Self {
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T, NotifyError> {
        let resp: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match (resp.ok, resp.result) {
            (true, Some(v)) => Ok(v),
            _ => Err(NotifyError::Api {
                method,
                description: resp.description.unwrap_or_else(|| "no result".into()),
            }),
        }
    }

    /// Long-polls for new text messages after `offset`.
    pub async fn updates(&self, offset: i64) -> Result<Vec<Incoming>, NotifyError> {
        let body = json!({
            "offset": offset,
            "timeout": UPDATES_WAIT_SECS,
            "allowed_updates": ["message"],
        });
        let wait = self.timeout + Duration::from_secs(UPDATES_WAIT_SECS);
        let updates: Vec<TgUpdate> = self.call("getUpdates", &body, wait).await?;

        Ok(updates
            .into_iter()
            .filter_map(|u| {
                let m = u.message?;
                Some(Incoming {
                    update_id: u.update_id,
                    handle: MessageHandle {
                        chat_id: m.chat.id.to_string(),
                        message_id: m.message_id,
                    },
                    text: m.text?,
                })
            })
            .collect())
    }
}

fn send_body(chat_id: &str, message: &Message) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": message.text,
    });
    if let Some(ParseMode::Html) = message.parse_mode {
        body["parse_mode"] = json!("HTML");
    }
    if let Some(b) = &message.button {
        body["reply_markup"] = json!({
            "inline_keyboard": [[{ "text": b.text, "url": b.url }]],
        });
    }
    body
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn send(&self, chat_id: &str, message: &Message) -> Result<MessageHandle, NotifyError> {
        let sent: TgMessage = self
            .call("sendMessage", &send_body(chat_id, message), self.timeout)
            .await?;
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: sent.message_id,
        })
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
        });
        let _: bool = self.call("deleteMessage", &body, self.timeout).await?;
        Ok(())
    }
}
