//! Telegram channel — long-polls the Bot API for commands and button presses.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Command, EventStream, InlineKeyboard, SurveyEvent, Transport};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Delay before retrying after a failed poll.
const POLL_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// A parsed update plus the identities used for the allowlist check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub username: Option<String>,
    pub event: SurveyEvent,
}

impl InboundUpdate {
    fn identities(&self) -> Vec<String> {
        let mut ids = vec![self.event.user_id.to_string()];
        if let Some(username) = &self.username {
            ids.push(username.clone());
        }
        ids
    }
}

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>, poll_timeout_secs: u64) -> Self {
        Self {
            bot_token,
            allowed_users,
            poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// POST a Bot API method and fail on a non-success status.
    async fn call(&self, method: &str, body: &Value) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let err = resp.text().await.unwrap_or_default();
        Err(ChannelError::SendFailed {
            name: "telegram".into(),
            reason: format!("{method} returned {status}: {err}"),
        })
    }
}

// ── Transport implementation ────────────────────────────────────────

#[async_trait]
impl Transport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let poll_timeout = self.poll_timeout_secs;
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": poll_timeout,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    tracing::warn!(response = %data, "Telegram getUpdates returned no result");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(inbound) = parse_update(update) else {
                        continue;
                    };

                    let identities = inbound.identities();
                    if !check_user_allowed(&allowed_users, identities.iter().map(String::as_str)) {
                        tracing::warn!(
                            user_id = inbound.event.user_id,
                            username = inbound.username.as_deref().unwrap_or("unknown"),
                            "Telegram: ignoring update from unauthorized user"
                        );
                        continue;
                    }

                    if tx.send(inbound.event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    /// Send a text message, splitting past Telegram's 4096 char limit.
    /// The keyboard is attached to the last chunk.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ChannelError> {
        for body in send_message_bodies(chat_id, text, keyboard)? {
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    async fn remove_keyboard(&self, chat_id: i64, message_id: i64) -> Result<(), ChannelError> {
        self.call("editMessageReplyMarkup", &remove_keyboard_body(chat_id, message_id))
            .await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.call("answerCallbackQuery", &answer_callback_body(callback_id))
            .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

/// sendMessage bodies for `text`, one per chunk. The keyboard rides on the
/// last chunk only.
fn send_message_bodies(
    chat_id: i64,
    text: &str,
    keyboard: Option<&InlineKeyboard>,
) -> Result<Vec<Value>, ChannelError> {
    let reply_markup = keyboard
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| ChannelError::SendFailed {
            name: "telegram".into(),
            reason: format!("keyboard serialization failed: {e}"),
        })?;

    let mut bodies: Vec<Value> = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH)
        .into_iter()
        .map(|chunk| serde_json::json!({ "chat_id": chat_id, "text": chunk }))
        .collect();

    if let (Some(markup), Some(last)) = (reply_markup, bodies.last_mut()) {
        last["reply_markup"] = markup;
    }
    Ok(bodies)
}

/// editMessageReplyMarkup body that clears the inline keyboard.
fn remove_keyboard_body(chat_id: i64, message_id: i64) -> Value {
    serde_json::json!({
        "chat_id": chat_id,
        "message_id": message_id,
        "reply_markup": InlineKeyboard::default(),
    })
}

fn answer_callback_body(callback_id: &str) -> Value {
    serde_json::json!({ "callback_query_id": callback_id })
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Convert a raw Bot API update into a survey event.
///
/// Only `/start`, `/done` and callback queries are of interest; anything
/// else yields `None`.
pub fn parse_update(update: &Value) -> Option<InboundUpdate> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(Value::as_i64)?;
        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .unwrap_or(user_id);
        let message_id = message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64);
        let callback_id = query.get("id").and_then(Value::as_str)?;
        let data = query.get("data").and_then(Value::as_str).unwrap_or_default();

        return Some(InboundUpdate {
            username: username(from),
            event: SurveyEvent::callback(
                "telegram",
                user_id,
                chat_id,
                callback_id,
                data,
                message_id,
            ),
        });
    }

    let message = update.get("message")?;
    let command = Command::parse(message.get("text").and_then(Value::as_str)?)?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;

    Some(InboundUpdate {
        username: username(from),
        event: SurveyEvent::command("telegram", user_id, chat_id, command),
    })
}

fn username(from: &Value) -> Option<String> {
    from.get("username")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Split a message into chunks of at most `max_len` characters.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        // Byte offset of the first char past the limit; none means the rest fits.
        let Some((boundary, _)) = remaining.char_indices().nth(max_len) else {
            chunks.push(remaining.to_string());
            break;
        };

        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&at| at > 0)
            .unwrap_or(boundary);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
