//! Dispatch loop — feeds transport events to the survey controller and
//! performs the actions it returns.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::channels::{Outgoing, SurveyEvent, Transport};
use crate::error::{ChannelError, Error};
use crate::survey::SurveyController;

/// Bounds on how often the idle sweep runs.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct SurveyBot {
    controller: Arc<SurveyController>,
    transport: Arc<dyn Transport>,
    session_idle_timeout: Option<Duration>,
}

impl SurveyBot {
    pub fn new(
        controller: Arc<SurveyController>,
        transport: Arc<dyn Transport>,
        session_idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            controller,
            transport,
            session_idle_timeout,
        }
    }

    /// Run until the transport's event stream ends.
    pub async fn run(&self) -> Result<(), Error> {
        self.transport.health_check().await?;
        let mut events = self.transport.start().await?;
        tracing::info!(channel = self.transport.name(), "Survey bot started");

        let sweep = self
            .session_idle_timeout
            .map(|max_idle| spawn_idle_sweep(Arc::clone(&self.controller), max_idle));

        while let Some(event) = events.next().await {
            self.process(&event).await;
        }

        if let Some(handle) = sweep {
            handle.abort();
        }
        self.transport.shutdown().await?;
        Ok(())
    }

    /// Handle one event. Delivery failures are logged; session state is
    /// never rolled back because of them.
    pub async fn process(&self, event: &SurveyEvent) {
        let actions = self.controller.handle(event).await;
        for action in &actions {
            if let Err(e) = self.deliver(action).await {
                tracing::warn!(
                    channel = %event.channel,
                    user_id = event.user_id,
                    error = %e,
                    "Failed to deliver survey action"
                );
            }
        }
    }

    async fn deliver(&self, action: &Outgoing) -> Result<(), ChannelError> {
        match action {
            Outgoing::SendText {
                chat_id,
                text,
                keyboard,
            } => {
                self.transport
                    .send_message(*chat_id, text, keyboard.as_ref())
                    .await
            }
            Outgoing::RemoveKeyboard {
                chat_id,
                message_id,
            } => self.transport.remove_keyboard(*chat_id, *message_id).await,
            Outgoing::AnswerCallback { callback_id } => {
                self.transport.answer_callback(callback_id).await
            }
        }
    }
}

/// Periodically drop sessions that have been idle for longer than `max_idle`.
pub fn spawn_idle_sweep(
    controller: Arc<SurveyController>,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = max_idle.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let pruned = controller.prune_idle(max_idle).await;
            if pruned > 0 {
                tracing::info!(pruned, "Dropped idle survey sessions");
            }
        }
    })
}
