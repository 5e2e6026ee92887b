//! Per-user survey session — transient, in-memory only.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{CatalogItem, Courier, NormalizationFactor, Reason};
use super::steps::{Slot, StepName};

/// Macro-state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyState {
    /// Waiting for the answer to "did all drivers report?".
    Q1,
    /// Inside the driver/reason/norm/more loop.
    Flow(StepName),
}

impl std::fmt::Display for SurveyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Q1 => f.write_str("q1"),
            Self::Flow(step) => write!(f, "flow:{step}"),
        }
    }
}

/// One recorded (driver, reason, normalization) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub driver: Courier,
    pub reason: Reason,
    pub norm: Option<NormalizationFactor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Correlation id for logs.
    pub id: Uuid,
    /// `None` when no step is recorded.
    pub state: Option<SurveyState>,
    /// Couriers not yet picked in this session. Only ever shrinks.
    pub available_driver_ids: BTreeSet<i64>,
    pub driver: Option<Courier>,
    pub reason: Option<Reason>,
    pub norm: Option<NormalizationFactor>,
    pub incidents: Vec<Incident>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// A fresh session waiting on the opening question.
    pub fn new(courier_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Some(SurveyState::Q1),
            available_driver_ids: courier_ids.into_iter().collect(),
            driver: None,
            reason: None,
            norm: None,
            incidents: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    /// Reset the roster and incident list at the start of the driver loop.
    pub fn begin_flow(&mut self, courier_ids: impl IntoIterator<Item = i64>) {
        self.available_driver_ids = courier_ids.into_iter().collect();
        self.incidents.clear();
        self.driver = None;
        self.reason = None;
        self.norm = None;
    }

    pub fn store(&mut self, slot: Slot, item: CatalogItem) {
        match slot {
            Slot::Driver => self.driver = Some(item),
            Slot::Reason => self.reason = Some(item),
            Slot::Norm => self.norm = Some(item),
        }
    }

    /// Remove a courier from the available set. Returns whether it was present.
    pub fn take_driver(&mut self, id: i64) -> bool {
        self.available_driver_ids.remove(&id)
    }

    /// The incident described by the current selection, if driver and
    /// reason are both set.
    pub fn pending_incident(&self) -> Option<Incident> {
        Some(Incident {
            driver: self.driver.clone()?,
            reason: self.reason.clone()?,
            norm: self.norm.clone(),
        })
    }

    /// Append the current selection to the incident list.
    pub fn record_incident(&mut self) -> Option<&Incident> {
        let incident = self.pending_incident()?;
        self.incidents.push(incident);
        self.incidents.last()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether the session has seen no activity for longer than `max_idle`.
    pub fn is_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> bool {
        let idle = now.signed_duration_since(self.last_activity);
        idle.to_std().map(|d| d > max_idle).unwrap_or(false)
    }
}
