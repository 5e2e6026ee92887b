//! Static reference lists — couriers, absence reasons, normalization factors.

/// One entry of a reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

impl CatalogItem {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A driver who may have failed to report to work.
pub type Courier = CatalogItem;
/// Fixed-vocabulary cause for absence.
pub type Reason = CatalogItem;
/// Fixed-vocabulary estimate of absence duration.
pub type NormalizationFactor = CatalogItem;

/// The compiled-in reference data a survey runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub couriers: Vec<Courier>,
    pub reasons: Vec<Reason>,
    pub norms: Vec<NormalizationFactor>,
}

impl Catalog {
    pub fn new(
        couriers: Vec<Courier>,
        reasons: Vec<Reason>,
        norms: Vec<NormalizationFactor>,
    ) -> Self {
        Self {
            couriers,
            reasons,
            norms,
        }
    }

    /// All courier ids in roster order.
    pub fn courier_ids(&self) -> Vec<i64> {
        self.couriers.iter().map(|c| c.id).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            couriers: vec![
                CatalogItem::new(1, "Иванов"),
                CatalogItem::new(2, "Петров"),
                CatalogItem::new(3, "Сидоров"),
                CatalogItem::new(4, "Романов"),
                CatalogItem::new(5, "Дубович"),
            ],
            reasons: vec![
                CatalogItem::new(1, "Дождь"),
                CatalogItem::new(2, "Пожар"),
                CatalogItem::new(3, "Протесты"),
            ],
            norms: vec![
                CatalogItem::new(1, "несколько часов"),
                CatalogItem::new(2, "пару дней"),
                CatalogItem::new(3, "неделя"),
            ],
        }
    }
}
