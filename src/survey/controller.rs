//! Survey conversation controller — per-user state machine.
//!
//! Every inbound event is turned into an ordered list of [`Outgoing`]
//! actions. The controller never talks to the transport itself; the
//! dispatch loop in `bot.rs` replays the actions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::channels::{Command, EventKind, InlineButton, InlineKeyboard, Outgoing, SurveyEvent};
use crate::error::SurveyError;

use super::catalog::{Catalog, CatalogItem};
use super::payload::{self, Answer};
use super::session::{Session, SurveyState};
use super::steps::{ListStep, Source, StepMode, StepName};
use super::summary;

const Q1_PROMPT: &str = "Вопрос 1: \"Все ли водители вышли на работу?\"";
const ALL_PRESENT: &str = "Отлично, все вышли. Опрос завершён.";
const NOT_ALL_PRESENT: &str = "Не все вышли. Делаем выбор водителей.";
const DRIVERS_EXHAUSTED: &str = "Все водители уже выбраны.";
const ABORTED: &str = "Опрос прерван.";

/// Whether the conversation continues after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Continue,
    End,
}

/// Actions produced while handling one event.
struct Outbox {
    chat_id: i64,
    ack: Vec<Outgoing>,
    messages: Vec<Outgoing>,
}

impl Outbox {
    fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ack: Vec::new(),
            messages: Vec::new(),
        }
    }

    fn say(&mut self, text: impl Into<String>) {
        self.messages.push(Outgoing::text(self.chat_id, text));
    }

    fn ask(&mut self, text: impl Into<String>, keyboard: InlineKeyboard) {
        self.messages
            .push(Outgoing::with_keyboard(self.chat_id, text, keyboard));
    }

    fn into_actions(self) -> Vec<Outgoing> {
        let mut actions = self.ack;
        actions.extend(self.messages);
        actions
    }
}

fn yes_no_keyboard(yes: &str, no: &str) -> InlineKeyboard {
    InlineKeyboard::single_row(vec![InlineButton::new("Да", yes), InlineButton::new("Нет", no)])
}

/// Drives one survey session per user.
pub struct SurveyController {
    catalog: Catalog,
    sessions: RwLock<HashMap<i64, Session>>,
}

impl SurveyController {
    pub fn new(catalog: Catalog) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Handle one inbound event and return the actions to perform, in order.
    pub async fn handle(&self, event: &SurveyEvent) -> Vec<Outgoing> {
        let mut outbox = Outbox::new(event.chat_id);
        let mut sessions = self.sessions.write().await;

        match &event.kind {
            EventKind::Command(Command::Start) => {
                self.start(&mut sessions, event.user_id, &mut outbox);
            }
            EventKind::Command(Command::Done) => {
                info!(user_id = event.user_id, "Survey aborted");
                sessions.remove(&event.user_id);
                outbox.say(ABORTED);
            }
            EventKind::Callback {
                callback_id,
                data,
                message_id,
            } => {
                outbox.ack.push(Outgoing::AnswerCallback {
                    callback_id: callback_id.clone(),
                });
                self.callback(&mut sessions, event, data, *message_id, &mut outbox);
            }
        }

        outbox.into_actions()
    }

    fn start(&self, sessions: &mut HashMap<i64, Session>, user_id: i64, outbox: &mut Outbox) {
        let session = Session::new(self.catalog.courier_ids());
        info!(user_id, session_id = %session.id, "Survey started");
        sessions.insert(user_id, session);
        outbox.ask(Q1_PROMPT, yes_no_keyboard(payload::Q1_YES, payload::Q1_NO));
    }

    fn callback(
        &self,
        sessions: &mut HashMap<i64, Session>,
        event: &SurveyEvent,
        data: &str,
        message_id: Option<i64>,
        outbox: &mut Outbox,
    ) {
        let user_id = event.user_id;
        let result = match sessions.get_mut(&user_id) {
            Some(session) => {
                session.touch();
                info!(
                    user_id,
                    state = %session.state.map(|s| s.to_string()).unwrap_or_default(),
                    data,
                    "Callback received"
                );
                self.dispatch(session, user_id, data, outbox)
            }
            None => Err(SurveyError::MissingState),
        };

        let remove_keyboard = match result {
            Ok(Transition::Continue) => true,
            Ok(Transition::End) => {
                sessions.remove(&user_id);
                true
            }
            Err(err) => {
                warn!(user_id, data, error = %err, "Survey callback rejected");
                outbox.say(err.user_notice());
                if err.ends_conversation() {
                    sessions.remove(&user_id);
                }
                err.ends_conversation()
            }
        };

        if remove_keyboard && let Some(message_id) = message_id {
            outbox.ack.push(Outgoing::RemoveKeyboard {
                chat_id: event.chat_id,
                message_id,
            });
        }
    }

    fn dispatch(
        &self,
        session: &mut Session,
        user_id: i64,
        data: &str,
        outbox: &mut Outbox,
    ) -> Result<Transition, SurveyError> {
        match session.state {
            None => Err(SurveyError::MissingState),
            Some(SurveyState::Q1) => self.handle_q1(session, user_id, data, outbox),
            Some(SurveyState::Flow(step)) => match step.descriptor().mode {
                StepMode::List(list) => {
                    self.handle_list_step(session, user_id, step, list, data, outbox)
                }
                StepMode::Binary { yes_next, no_next } => {
                    let next = match Answer::from_binary(data)? {
                        Answer::Yes => yes_next,
                        Answer::No => no_next,
                    };
                    info!(user_id, answer = data, next_step = ?next, "Binary step answered");
                    match next {
                        Some(next) => self.enter_step(session, user_id, next, outbox),
                        None => self.finish(session, user_id, outbox),
                    }
                }
            },
        }
    }

    fn handle_q1(
        &self,
        session: &mut Session,
        user_id: i64,
        data: &str,
        outbox: &mut Outbox,
    ) -> Result<Transition, SurveyError> {
        match Answer::from_q1(data)? {
            Answer::Yes => {
                info!(user_id, "All drivers reported");
                outbox.say(ALL_PRESENT);
                Ok(Transition::End)
            }
            Answer::No => {
                outbox.say(NOT_ALL_PRESENT);
                session.begin_flow(self.catalog.courier_ids());
                self.enter_step(session, user_id, StepName::Driver, outbox)
            }
        }
    }

    /// Items offered by a list step. Couriers are limited to those not yet picked.
    fn step_items(&self, session: &Session, source: Source) -> Vec<&CatalogItem> {
        let items = source.items(&self.catalog).iter();
        match source {
            Source::Couriers => items
                .filter(|c| session.available_driver_ids.contains(&c.id))
                .collect(),
            Source::Reasons | Source::Norms => items.collect(),
        }
    }

    fn enter_step(
        &self,
        session: &mut Session,
        user_id: i64,
        step: StepName,
        outbox: &mut Outbox,
    ) -> Result<Transition, SurveyError> {
        let descriptor = step.descriptor();
        session.state = Some(SurveyState::Flow(step));
        info!(user_id, %step, mode = descriptor.mode.label(), "Entering step");

        match descriptor.mode {
            StepMode::List(list) => {
                let items = self.step_items(session, list.source);
                if items.is_empty() && list.source == Source::Couriers {
                    info!(user_id, "No drivers left to pick");
                    outbox.say(DRIVERS_EXHAUSTED);
                    return self.finish(session, user_id, outbox);
                }
                let buttons = items
                    .into_iter()
                    .map(|item| InlineButton::new(&item.name, payload::selection(step, item.id)))
                    .collect();
                outbox.ask(descriptor.title, InlineKeyboard::single_row(buttons));
            }
            StepMode::Binary { .. } => {
                if step == StepName::More
                    && session.record_incident().is_some()
                    && let Some(incident) = session.incidents.last()
                {
                    info!(
                        user_id,
                        driver = %incident.driver.name,
                        reason = %incident.reason.name,
                        norm = ?incident.norm.as_ref().map(|n| n.name.as_str()),
                        total = session.incidents.len(),
                        "Incident recorded"
                    );
                }
                outbox.ask(descriptor.title, yes_no_keyboard(payload::YES, payload::NO));
            }
        }
        Ok(Transition::Continue)
    }

    fn handle_list_step(
        &self,
        session: &mut Session,
        user_id: i64,
        step: StepName,
        list: ListStep,
        data: &str,
        outbox: &mut Outbox,
    ) -> Result<Transition, SurveyError> {
        let id = payload::parse_selection(data, step)?;
        let item = self
            .step_items(session, list.source)
            .into_iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(SurveyError::UnknownItem { step, id })?;

        if list.source == Source::Couriers {
            session.take_driver(id);
            info!(
                user_id,
                picked_driver_id = id,
                remaining = ?session.available_driver_ids,
                "Driver picked"
            );
        }
        info!(user_id, %step, picked = %item.name, "Item picked");

        let name = item.name.clone();
        session.store(list.save_to, item);

        match list.next {
            Some(next) => {
                outbox.say(format!("Вы выбрали {name}."));
                self.enter_step(session, user_id, next, outbox)
            }
            None => self.finish(session, user_id, outbox),
        }
    }

    /// Send the grouped summary. The session is cleared by the caller.
    fn finish(
        &self,
        session: &Session,
        user_id: i64,
        outbox: &mut Outbox,
    ) -> Result<Transition, SurveyError> {
        let synthesized;
        let incidents = if session.incidents.is_empty() {
            synthesized = [session
                .pending_incident()
                .ok_or(SurveyError::InsufficientData)?];
            &synthesized[..]
        } else {
            &session.incidents[..]
        };

        let text = summary::render(incidents);
        info!(
            user_id,
            incidents = incidents.len(),
            summary = %text.replace('\n', " | "),
            "Survey summary"
        );
        outbox.say(text);
        Ok(Transition::End)
    }

    // ── Observation ─────────────────────────────────────────────────

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn has_session(&self, user_id: i64) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }

    /// Clone of a user's current session.
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many were dropped.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|user_id, session| {
            let idle = session.is_idle(now, max_idle);
            if idle {
                debug!(user_id, session_id = %session.id, "Pruning idle session");
            }
            !idle
        });
        before - sessions.len()
    }
}
