//! Transport trait and the event/action types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::error::ChannelError;

/// Slash commands the survey reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Done,
}

impl Command {
    /// Parse a command message such as `/start` or `/done@turnout_bot`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let word = word.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Self::Start),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command(Command),
    /// An inline button press.
    Callback {
        callback_id: String,
        data: String,
        /// Message the pressed keyboard belongs to.
        message_id: Option<i64>,
    },
}

/// Inbound event from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyEvent {
    /// Source channel: "telegram", "cli".
    pub channel: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub kind: EventKind,
}

impl SurveyEvent {
    pub fn command(channel: &str, user_id: i64, chat_id: i64, command: Command) -> Self {
        Self {
            channel: channel.to_string(),
            user_id,
            chat_id,
            kind: EventKind::Command(command),
        }
    }

    pub fn callback(
        channel: &str,
        user_id: i64,
        chat_id: i64,
        callback_id: impl Into<String>,
        data: impl Into<String>,
        message_id: Option<i64>,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            user_id,
            chat_id,
            kind: EventKind::Callback {
                callback_id: callback_id.into(),
                data: data.into(),
                message_id,
            },
        }
    }
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard, serialized in Bot API `InlineKeyboardMarkup` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// A keyboard with all buttons on one row.
    pub fn single_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            inline_keyboard: vec![buttons],
        }
    }

    /// Iterate all buttons row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.inline_keyboard.iter().flatten()
    }
}

/// An action the controller asks the transport to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    SendText {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    RemoveKeyboard {
        chat_id: i64,
        message_id: i64,
    },
    AnswerCallback {
        callback_id: String,
    },
}

impl Outgoing {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self::SendText {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(chat_id: i64, text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self::SendText {
            chat_id,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = SurveyEvent> + Send>>;

/// A messaging transport: delivers inbound events and performs outbound actions.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ChannelError>;

    /// Remove the inline keyboard from a previously sent message.
    async fn remove_keyboard(&self, chat_id: i64, message_id: i64) -> Result<(), ChannelError>;

    /// Acknowledge a button press.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
