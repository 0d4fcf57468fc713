// src/services/insights.rs
use serde::Serialize;

use crate::domain::inventory::InventoryItem;
use crate::fixtures;
use crate::services::inventory::InventoryService;
use crate::store::TreeStore;

/// Keyword in the product name -> reporting category. First match wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("Basmati", "Premium Rice"),
    ("Sona", "Regular Rice"),
    ("Brown", "Health Rice"),
    ("Jasmine", "Aromatic Rice"),
    ("Paddy", "Raw Material"),
    ("Bran", "By-product"),
];
const DEFAULT_CATEGORY: &str = "Regular Rice";

/// Days of supply assumed when there is no sales history to measure usage.
const SUPPLY_DAYS: f64 = 30.0;

pub fn category_for(product_name: &str) -> &'static str {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| product_name.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRow {
    pub product: String,
    pub category: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: Option<f64>,
    pub daily_usage: f64,
    pub price: f64,
}

impl StockRow {
    pub fn from_item(item: &InventoryItem) -> Self {
        StockRow {
            product: item.name.clone(),
            category: category_for(&item.name).to_string(),
            current_stock: item.current_stock,
            min_stock: item.min_stock_level,
            max_stock: None,
            daily_usage: (item.current_stock.max(0.0) / SUPPLY_DAYS).floor(),
            price: item.price_per_kg,
        }
    }

    /// Days until empty at the current usage; `None` when nothing is used.
    pub fn days_of_cover(&self) -> Option<f64> {
        (self.daily_usage > 0.0).then(|| (self.current_stock / self.daily_usage).floor())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotSource {
    Live,
    /// Built-in sample figures, used when live data could not be read.
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub source: SnapshotSource,
    pub rows: Vec<StockRow>,
}

/// Stock figures for the forecasting panel. Never fails: a failed or empty
/// read falls back to the fixture data set, with a warning.
pub fn stock_snapshot(store: &dyn TreeStore) -> StockSnapshot {
    match InventoryService::new(store).list_all() {
        Ok(items) if !items.is_empty() => StockSnapshot {
            source: SnapshotSource::Live,
            rows: items.iter().map(StockRow::from_item).collect(),
        },
        Ok(_) => {
            log::warn!("no inventory yet, showing sample stock figures");
            fixture_snapshot()
        }
        Err(e) => {
            log::warn!("could not read inventory ({e}), showing sample stock figures");
            fixture_snapshot()
        }
    }
}

fn fixture_snapshot() -> StockSnapshot {
    StockSnapshot {
        source: SnapshotSource::Fixture,
        rows: fixtures::stock_rows(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categories_by_keyword() {
        assert_eq!(category_for("Basmati Rice"), "Premium Rice");
        assert_eq!(category_for("Sona Masoori"), "Regular Rice");
        assert_eq!(category_for("Brown Basmati"), "Premium Rice");
        assert_eq!(category_for("Rice Bran"), "By-product");
        assert_eq!(category_for("Keeri Samba"), "Regular Rice");
    }

    #[test]
    fn daily_usage_assumes_a_month_of_supply() {
        let item = InventoryItem::from_raw(
            "p",
            &json!({"name": "Jasmine Rice", "current_stock": 3100, "price_per_kg": 400}),
        )
        .unwrap();
        let row = StockRow::from_item(&item);
        assert_eq!(row.category, "Aromatic Rice");
        assert_eq!(row.daily_usage, 103.0);
        assert_eq!(row.days_of_cover(), Some(30.0));
    }
}
