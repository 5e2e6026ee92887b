//! Driver turnout survey — the conversation state machine.
//!
//! An operator answers "did all drivers report?". On "no" the survey loops
//! through driver → reason → normalization → "finished?" until every absent
//! driver is recorded, then sends one summary line per absence reason.

pub mod catalog;
pub mod controller;
pub mod payload;
pub mod session;
pub mod steps;
pub mod summary;

pub use catalog::{Catalog, CatalogItem, Courier, NormalizationFactor, Reason};
pub use controller::SurveyController;
pub use session::{Incident, Session, SurveyState};
pub use steps::{StepDescriptor, StepMode, StepName};
