//! Summary rendering — incidents grouped by absence reason.

use super::catalog::{Courier, Reason};
use super::session::Incident;

const HEADER: &str = "🔔 ИНЦИДЕНТЫ:";
const SUBHEADER: &str = "Список водителей, которые не вышли на работу:";

/// Drivers sharing one absence reason, in the order they were recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonGroup<'a> {
    pub reason: &'a Reason,
    pub drivers: Vec<&'a Courier>,
}

impl ReasonGroup<'_> {
    /// One summary line, singular or plural depending on the group size.
    pub fn line(&self) -> String {
        let names = self
            .drivers
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if self.drivers.len() == 1 {
            format!("- Водитель {names} не вышел. Причина – {}", self.reason.name)
        } else {
            format!("- Водители {names} не вышли. Причина – {}", self.reason.name)
        }
    }
}

/// Group incidents by reason id, keeping first-encounter order of reasons.
pub fn group_by_reason(incidents: &[Incident]) -> Vec<ReasonGroup<'_>> {
    let mut groups: Vec<ReasonGroup<'_>> = Vec::new();
    for incident in incidents {
        match groups.iter_mut().find(|g| g.reason.id == incident.reason.id) {
            Some(group) => group.drivers.push(&incident.driver),
            None => groups.push(ReasonGroup {
                reason: &incident.reason,
                drivers: vec![&incident.driver],
            }),
        }
    }
    groups
}

/// Full summary message text.
pub fn render(incidents: &[Incident]) -> String {
    let mut lines = vec![HEADER.to_string(), SUBHEADER.to_string()];
    lines.extend(group_by_reason(incidents).iter().map(ReasonGroup::line));
    lines.join("\n")
}
