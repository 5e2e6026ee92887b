//! Integration tests for the survey dispatch loop.
//!
//! Each test drives `SurveyBot` with a scripted event stream and a
//! recording transport, then inspects what would have been sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use turnout_bot::bot::SurveyBot;
use turnout_bot::channels::{
    Command, EventStream, InlineKeyboard, SurveyEvent, Transport,
};
use turnout_bot::error::{ChannelError, Error};
use turnout_bot::survey::{Catalog, CatalogItem, SurveyController, SurveyState};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const USER: i64 = 100;
const CHAT: i64 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Text {
        text: String,
        buttons: Vec<String>,
    },
    RemovedKeyboard(i64),
    Answered(String),
}

/// Transport stub that replays a fixed script and records every action.
struct RecordingTransport {
    script: Mutex<Vec<SurveyEvent>>,
    sent: Mutex<Vec<Sent>>,
    fail_sends: bool,
    healthy: bool,
}

impl RecordingTransport {
    fn new(script: Vec<SurveyEvent>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
            fail_sends: false,
            healthy: true,
        })
    }

    fn failing(script: Vec<SurveyEvent>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
            healthy: true,
        })
    }

    fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: false,
            healthy: false,
        })
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let script = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::pin(futures::stream::iter(script)))
    }

    async fn send_message(
        &self,
        _chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::SendFailed {
                name: "recording".into(),
                reason: "offline".into(),
            });
        }
        let buttons = keyboard
            .map(|kb| kb.buttons().map(|b| b.callback_data.clone()).collect())
            .unwrap_or_default();
        self.sent.lock().unwrap().push(Sent::Text {
            text: text.to_string(),
            buttons,
        });
        Ok(())
    }

    async fn remove_keyboard(&self, _chat_id: i64, message_id: i64) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::RemovedKeyboard(message_id));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Answered(callback_id.to_string()));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "recording".into(),
                reason: "bad token".into(),
            })
        }
    }
}

fn start() -> SurveyEvent {
    SurveyEvent::command("recording", USER, CHAT, Command::Start)
}

fn press(n: usize, data: &str) -> SurveyEvent {
    SurveyEvent::callback(
        "recording",
        USER,
        CHAT,
        format!("cb-{n}"),
        data,
        Some(n as i64),
    )
}

fn script(presses: &[&str]) -> Vec<SurveyEvent> {
    let mut events = vec![start()];
    events.extend(presses.iter().enumerate().map(|(i, d)| press(i + 1, d)));
    events
}

fn two_courier_catalog() -> Catalog {
    Catalog::new(
        vec![CatalogItem::new(1, "Иванов"), CatalogItem::new(2, "Петров")],
        vec![CatalogItem::new(1, "Дождь")],
        vec![
            CatalogItem::new(1, "несколько часов"),
            CatalogItem::new(2, "пару дней"),
        ],
    )
}

async fn run_bot(
    catalog: Catalog,
    transport: Arc<RecordingTransport>,
) -> (Arc<SurveyController>, Result<(), Error>) {
    let controller = SurveyController::new(catalog);
    let bot = SurveyBot::new(Arc::clone(&controller), transport, None);
    let result = timeout(TEST_TIMEOUT, bot.run())
        .await
        .expect("bot run timed out");
    (controller, result)
}

#[tokio::test]
async fn full_survey_produces_grouped_summary() {
    let transport = RecordingTransport::new(script(&[
        "q1_no", "driver:1", "reason:1", "norm:1", "no", "driver:2", "reason:1", "norm:2", "yes",
    ]));
    let (controller, result) = run_bot(two_courier_catalog(), Arc::clone(&transport)).await;
    result.unwrap();

    let texts = transport.texts();
    assert_eq!(
        texts.last().unwrap(),
        "🔔 ИНЦИДЕНТЫ:\n\
         Список водителей, которые не вышли на работу:\n\
         - Водители Иванов, Петров не вышли. Причина – Дождь"
    );
    assert_eq!(controller.session_count().await, 0);

    // Every button press is acknowledged and its keyboard removed.
    let sent = transport.sent();
    for n in 1..=9 {
        assert!(sent.contains(&Sent::Answered(format!("cb-{n}"))));
        assert!(sent.contains(&Sent::RemovedKeyboard(n)));
    }
}

#[tokio::test]
async fn second_driver_prompt_only_offers_remaining_courier() {
    let transport = RecordingTransport::new(script(&[
        "q1_no", "driver:1", "reason:1", "norm:1", "no",
    ]));
    let (controller, result) = run_bot(two_courier_catalog(), Arc::clone(&transport)).await;
    result.unwrap();

    let last_prompt = transport
        .sent()
        .into_iter()
        .rev()
        .find_map(|s| match s {
            Sent::Text { text, buttons } if !buttons.is_empty() => Some((text, buttons)),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_prompt.0, "Выберите водителя");
    assert_eq!(last_prompt.1, vec!["driver:2"]);

    let session = controller.snapshot(USER).await.unwrap();
    assert_eq!(session.incidents.len(), 1);
}

#[tokio::test]
async fn all_present_ends_immediately() {
    let transport = RecordingTransport::new(script(&["q1_yes"]));
    let (controller, result) = run_bot(Catalog::default(), Arc::clone(&transport)).await;
    result.unwrap();

    assert_eq!(
        transport.texts(),
        vec![
            "Вопрос 1: \"Все ли водители вышли на работу?\"",
            "Отлично, все вышли. Опрос завершён.",
        ]
    );
    assert!(!controller.has_session(USER).await);
}

#[tokio::test]
async fn done_mid_survey_aborts_without_summary() {
    let mut events = script(&["q1_no", "driver:1"]);
    events.push(SurveyEvent::command("recording", USER, CHAT, Command::Done));
    let transport = RecordingTransport::new(events);
    let (controller, result) = run_bot(Catalog::default(), Arc::clone(&transport)).await;
    result.unwrap();

    let texts = transport.texts();
    assert_eq!(texts.last().unwrap(), "Опрос прерван.");
    assert!(!texts.iter().any(|t| t.contains("ИНЦИДЕНТЫ")));
    assert!(!controller.has_session(USER).await);
}

#[tokio::test]
async fn failed_sends_do_not_roll_back_state() {
    let transport = RecordingTransport::failing(script(&["q1_no", "driver:3"]));
    let (controller, result) = run_bot(Catalog::default(), Arc::clone(&transport)).await;
    result.unwrap();

    assert!(transport.texts().is_empty());
    let session = controller.snapshot(USER).await.unwrap();
    assert!(matches!(session.state, Some(SurveyState::Flow(_))));
    assert!(!session.available_driver_ids.contains(&3));
    assert_eq!(session.driver.unwrap().name, "Сидоров");
}

#[tokio::test]
async fn unhealthy_transport_fails_startup() {
    let (_, result) = run_bot(Catalog::default(), RecordingTransport::unhealthy()).await;
    assert!(matches!(
        result,
        Err(Error::Channel(ChannelError::StartupFailed { .. }))
    ));
}
