//! Step table — declarative descriptors for each sub-step of the flow.
//!
//! The flow is a fixed loop: Driver → Reason → Norm → More, where More
//! either ends the survey ("yes") or goes back to Driver ("no").

use super::catalog::{Catalog, CatalogItem};

/// Identifier of a sub-step within the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepName {
    Driver,
    Reason,
    Norm,
    More,
}

impl StepName {
    pub const ALL: [StepName; 4] = [Self::Driver, Self::Reason, Self::Norm, Self::More];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Reason => "reason",
            Self::Norm => "norm",
            Self::More => "more",
        }
    }

    /// The immutable descriptor for this step.
    pub fn descriptor(self) -> &'static StepDescriptor {
        match self {
            Self::Driver => &STEPS[0],
            Self::Reason => &STEPS[1],
            Self::Norm => &STEPS[2],
            Self::More => &STEPS[3],
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which reference list a list-mode step draws its buttons from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Couriers,
    Reasons,
    Norms,
}

impl Source {
    pub fn items(self, catalog: &Catalog) -> &[CatalogItem] {
        match self {
            Self::Couriers => &catalog.couriers,
            Self::Reasons => &catalog.reasons,
            Self::Norms => &catalog.norms,
        }
    }
}

/// Session field a list-mode pick is stored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Driver,
    Reason,
    Norm,
}

/// One button per item; the pick is saved and the flow moves to `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListStep {
    pub source: Source,
    pub save_to: Slot,
    pub next: Option<StepName>,
}

/// How a step is presented and how its answer routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    List(ListStep),
    /// Yes/no buttons; `None` means the survey ends with a summary.
    Binary {
        yes_next: Option<StepName>,
        no_next: Option<StepName>,
    },
}

impl StepMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Binary { .. } => "binary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor {
    pub name: StepName,
    pub title: &'static str,
    pub mode: StepMode,
}

static STEPS: [StepDescriptor; 4] = [
    StepDescriptor {
        name: StepName::Driver,
        title: "Выберите водителя",
        mode: StepMode::List(ListStep {
            source: Source::Couriers,
            save_to: Slot::Driver,
            next: Some(StepName::Reason),
        }),
    },
    StepDescriptor {
        name: StepName::Reason,
        title: "Выберите причину",
        mode: StepMode::List(ListStep {
            source: Source::Reasons,
            save_to: Slot::Reason,
            next: Some(StepName::Norm),
        }),
    },
    StepDescriptor {
        name: StepName::Norm,
        title: "Выберите нормализацию",
        mode: StepMode::List(ListStep {
            source: Source::Norms,
            save_to: Slot::Norm,
            next: Some(StepName::More),
        }),
    },
    StepDescriptor {
        name: StepName::More,
        title: "Хотите закончить выбор водителей?",
        mode: StepMode::Binary {
            yes_next: None,
            no_next: Some(StepName::Driver),
        },
    },
];
