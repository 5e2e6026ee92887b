//! CLI channel — stdin/stdout REPL for running a survey locally.
//!
//! `/start` and `/done` are commands; any other line is treated as a
//! button press whose callback data is the line itself.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Command, EventStream, InlineKeyboard, SurveyEvent, Transport};
use crate::error::ChannelError;

const LOCAL_USER: i64 = 1;
const LOCAL_CHAT: i64 = 1;

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Turn one input line into an event. Empty lines yield `None`.
fn line_to_event(line: &str, seq: u64) -> Option<SurveyEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let event = match Command::parse(line) {
        Some(command) => SurveyEvent::command("cli", LOCAL_USER, LOCAL_CHAT, command),
        None => SurveyEvent::callback(
            "cli",
            LOCAL_USER,
            LOCAL_CHAT,
            format!("cli-{seq}"),
            line,
            None,
        ),
    };
    Some(event)
}

/// Render a keyboard as `[label → payload]` entries, one row per line.
fn render_keyboard(keyboard: &InlineKeyboard) -> String {
    keyboard
        .inline_keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| format!("[{} → {}]", b.text, b.callback_data))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Transport for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let mut seq: u64 = 0;

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(event) = line_to_event(&line, seq) else {
                            eprint!("> ");
                            continue;
                        };
                        seq += 1;
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_message(
        &self,
        _chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ChannelError> {
        println!("\n{text}");
        if let Some(kb) = keyboard {
            println!("{}", render_keyboard(kb));
        }
        eprint!("> ");
        Ok(())
    }

    async fn remove_keyboard(&self, _chat_id: i64, _message_id: i64) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}
