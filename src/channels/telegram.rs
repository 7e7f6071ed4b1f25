use crate::channels::traits::{
    ChannelAdapter, InboundMessage, OutboundMessage, ReplyKeyboard, TextMarkup,
};
use crate::config::TelegramConfig;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::mpsc;

/// Telegram channel adapter using Bot API long polling.
pub struct TelegramAdapter {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    /// Next `getUpdates` offset; one past the last update seen.
    offset: AtomicI64,
    client: reqwest::Client,
}

impl TelegramAdapter {
    pub fn new(bot_token: &str, config: &TelegramConfig) -> Self {
        Self {
            bot_token: bot_token.to_owned(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: AtomicI64::new(0),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Build the `sendMessage` request body.
    #[must_use]
    pub fn send_message_body(message: &OutboundMessage) -> Value {
        let mut body = json!({
            "chat_id": message.chat_id,
            "text": message.text,
        });
        if let Some(TextMarkup::Markdown) = message.markup {
            body["parse_mode"] = json!("Markdown");
        }
        if message.disable_link_preview {
            body["link_preview_options"] = json!({ "is_disabled": true });
        }
        if let Some(keyboard) = &message.keyboard {
            body["reply_markup"] = keyboard_markup(keyboard);
        }
        body
    }

    /// Extract text messages from a `getUpdates` response.
    ///
    /// Returns the messages and the highest update id seen, including updates
    /// that carried no text.
    #[must_use]
    pub fn parse_updates(payload: &Value) -> (Vec<InboundMessage>, Option<i64>) {
        let mut messages = Vec::new();
        let mut last_update_id = None;

        let Some(updates) = payload.get("result").and_then(Value::as_array) else {
            return (messages, last_update_id);
        };

        for update in updates {
            if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
                last_update_id = Some(last_update_id.map_or(id, |prev: i64| prev.max(id)));
            }

            let Some(message) = update.get("message") else {
                continue;
            };
            let from_bot = message
                .get("from")
                .and_then(|f| f.get("is_bot"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if from_bot {
                continue;
            }

            let user_id = message
                .get("from")
                .and_then(|f| f.get("id"))
                .and_then(Value::as_i64);
            let chat_id = message
                .get("chat")
                .and_then(|c| c.get("id"))
                .and_then(Value::as_i64);
            let text = message
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();

            let (Some(user_id), Some(chat_id)) = (user_id, chat_id) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }

            messages.push(InboundMessage {
                channel: "telegram".to_owned(),
                user_id,
                chat_id,
                text: text.to_owned(),
            });
        }

        (messages, last_update_id)
    }

    async fn call(&self, method: &str, body: &Value) -> anyhow::Result<Value> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("telegram {method} failed ({status}): {body}");
        }

        let payload: Value = response.json().await?;
        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = payload
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            anyhow::bail!("telegram {method} rejected: {description}");
        }
        Ok(payload)
    }
}

fn keyboard_markup(keyboard: &ReplyKeyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
        .collect();
    json!({
        "keyboard": rows,
        "resize_keyboard": true,
        "one_time_keyboard": keyboard.one_time,
    })
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn id(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let body = Self::send_message_body(&message);
        self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn run(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("telegram bot token is empty");
        }

        loop {
            let body = json!({
                "offset": self.offset.load(Ordering::Acquire),
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message"],
            });
            let payload = self.call("getUpdates", &body).await?;
            let (messages, last_update_id) = Self::parse_updates(&payload);
            if let Some(id) = last_update_id {
                self.offset.store(id + 1, Ordering::Release);
            }

            for message in messages {
                if inbound_tx.send(message).await.is_err() {
                    // Runtime is shutting down.
                    return Ok(());
                }
            }
        }
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        if self.bot_token.trim().is_empty() {
            return Ok(false);
        }
        let response = self
            .client
            .post(self.method_url("getMe"))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}
