// src/services/inventory.rs
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::domain::fields::{children, parse_timestamp};
use crate::domain::format::{kg, rupees};
use crate::domain::inventory::{
    InventoryItem, ItemUpdate, NewInventoryItem, StockMovement, DEFAULT_QUALITY_SCORE,
};
use crate::domain::stock::{StockStatus, CRITICAL_RATIO};
use crate::errors::MillError;
use crate::services::{decode_children, now_iso};
use crate::store::{child_path, TreeStore};

pub const PRODUCTS: &str = "products";
pub const STOCK_UPDATES: &str = "stock_updates";
pub const KPIS: &str = "inventory_kpis";
pub const DISTRIBUTION: &str = "inventory_distribution";

/// Days of cover assumed when stock sits exactly at the minimum level.
const PREDICTION_HORIZON_DAYS: f64 = 30.0;
const CRITICAL_RISK_RATIO: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryKpis {
    pub total_bags: f64,
    pub total_kg: f64,
    pub total_value: f64,
    /// Critical or Low Stock, not yet empty.
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub avg_quality_score: f64,
    pub active_warehouses: usize,
    pub last_updated: String,
}

/// One slice of the category distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    /// Rounded percent of all stock by weight.
    #[serde(rename = "value")]
    pub percentage: u32,
    /// Display form, e.g. `"12,500 kg"`.
    pub quantity: String,
    pub items: usize,
    /// Display form, e.g. `"₹2,650,000"`.
    pub value_in_rupees: String,
    pub quantity_kg: f64,
    pub stock_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Critical,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPrediction {
    pub item: InventoryItem,
    pub stock_ratio: f64,
    pub days_to_out: i64,
    pub predicted_out_date: NaiveDate,
    pub risk: RiskLevel,
}

pub fn compute_kpis(items: &[InventoryItem], now: &str) -> InventoryKpis {
    let avg_quality_score = if items.is_empty() {
        DEFAULT_QUALITY_SCORE
    } else {
        let sum: f64 = items
            .iter()
            .map(|i| i.quality_score.unwrap_or(DEFAULT_QUALITY_SCORE))
            .sum();
        (sum / items.len() as f64 * 10.0).round() / 10.0
    };

    let warehouses: HashSet<&str> = items.iter().map(|i| i.warehouse.as_str()).collect();

    InventoryKpis {
        total_bags: items.iter().map(|i| i.bags).sum(),
        total_kg: items.iter().map(|i| i.current_stock).sum(),
        total_value: items.iter().map(InventoryItem::stock_value).sum(),
        low_stock_items: items.iter().filter(|i| i.status.is_low()).count(),
        out_of_stock_items: items
            .iter()
            .filter(|i| i.status == StockStatus::OutOfStock)
            .count(),
        avg_quality_score,
        active_warehouses: warehouses.len(),
        last_updated: now.to_string(),
    }
}

pub fn compute_distribution(items: &[InventoryItem]) -> Vec<CategoryShare> {
    // (kg, items, value) per category, ordered by name.
    let mut by_type: BTreeMap<&str, (f64, usize, f64)> = BTreeMap::new();
    for item in items {
        let entry = by_type.entry(item.rice_type.as_str()).or_default();
        entry.0 += item.current_stock;
        entry.1 += 1;
        entry.2 += item.stock_value();
    }

    let total_kg: f64 = by_type.values().map(|(q, _, _)| q).sum();

    by_type
        .into_iter()
        .map(|(category, (quantity_kg, count, value))| CategoryShare {
            category: category.to_string(),
            percentage: if total_kg > 0.0 {
                (quantity_kg / total_kg * 100.0).round().max(0.0) as u32
            } else {
                0
            },
            quantity: kg(quantity_kg),
            items: count,
            value_in_rupees: rupees(value),
            quantity_kg,
            stock_value: value,
        })
        .collect()
}

/// Items below 30% of their minimum, with a naive linear run-out estimate.
pub fn predict_low_stock(items: &[InventoryItem], today: NaiveDate) -> Vec<StockPrediction> {
    items
        .iter()
        .filter_map(|item| {
            let ratio = item.stock_ratio().max(0.0);
            if ratio >= CRITICAL_RATIO {
                return None;
            }
            let days_to_out = (ratio * PREDICTION_HORIZON_DAYS).floor() as i64;
            Some(StockPrediction {
                item: item.clone(),
                stock_ratio: ratio,
                days_to_out,
                predicted_out_date: today + Duration::days(days_to_out),
                risk: if ratio < CRITICAL_RISK_RATIO {
                    RiskLevel::Critical
                } else {
                    RiskLevel::High
                },
            })
        })
        .collect()
}

pub struct InventoryService<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> InventoryService<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> Result<Vec<InventoryItem>, MillError> {
        match self.store.get(PRODUCTS)? {
            Some(node) => Ok(decode_children(&node, "inventory item", InventoryItem::from_raw)),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<InventoryItem>, MillError> {
        self.store
            .get(&child_path(PRODUCTS, id))?
            .map(|raw| InventoryItem::from_raw(id, &raw))
            .transpose()
    }

    pub fn add_item(&self, input: NewInventoryItem) -> Result<InventoryItem, MillError> {
        input.validate()?;

        let id = self.store.new_key();
        let item = input.into_item(id, &now_iso());
        self.store
            .set(&child_path(PRODUCTS, &item.id), &item.to_record())?;
        log::info!("added inventory item {} ({})", item.id, item.name);

        self.refresh_aggregates()?;
        Ok(item)
    }

    pub fn update_item(&self, id: &str, update: ItemUpdate) -> Result<InventoryItem, MillError> {
        let mut item = self
            .get_by_id(id)?
            .ok_or_else(|| MillError::NotFound(format!("inventory item {id}")))?;
        let before = item.current_stock;

        item.apply(update, &now_iso())?;

        // Merge, so fields this layer does not know about survive.
        if let Value::Object(fields) = item.to_record() {
            self.store.update(&child_path(PRODUCTS, id), &fields)?;
        }
        self.record_movement(&item, "update", item.current_stock - before)?;
        log::info!("updated inventory item {id}: {}", item.status);

        self.refresh_aggregates()?;
        Ok(item)
    }

    pub fn delete_item(&self, id: &str) -> Result<(), MillError> {
        let path = child_path(PRODUCTS, id);
        if self.store.get(&path)?.is_none() {
            return Err(MillError::NotFound(format!("inventory item {id}")));
        }
        self.store.remove(&path)?;
        log::info!("deleted inventory item {id}");

        self.refresh_aggregates()
    }

    pub fn record_movement(
        &self,
        item: &InventoryItem,
        kind: &str,
        quantity: f64,
    ) -> Result<StockMovement, MillError> {
        let mut movement = StockMovement {
            id: String::new(),
            item_id: item.id.clone(),
            item_name: Some(item.name.clone()),
            kind: kind.to_string(),
            quantity,
            warehouse: Some(item.warehouse.clone()),
            from: None,
            to: None,
            timestamp: Some(now_iso()),
            user: "System".to_string(),
        };
        movement.id = self.store.push(STOCK_UPDATES, &movement.to_record())?;
        Ok(movement)
    }

    /// Newest first.
    pub fn recent_movements(&self, limit: usize) -> Result<Vec<StockMovement>, MillError> {
        let Some(node) = self.store.get(STOCK_UPDATES)? else {
            return Ok(Vec::new());
        };
        let mut movements = decode_children(&node, "stock movement", StockMovement::from_raw);
        // Undated or unreadable timestamps go last.
        movements.sort_by_cached_key(|m| {
            std::cmp::Reverse(m.timestamp.as_deref().and_then(parse_timestamp))
        });
        movements.truncate(limit);
        Ok(movements)
    }

    pub fn refresh_distribution(&self) -> Result<Vec<CategoryShare>, MillError> {
        let distribution = compute_distribution(&self.list_all()?);
        self.store
            .set(DISTRIBUTION, &serde_json::to_value(&distribution)?)?;
        Ok(distribution)
    }

    /// The stored distribution, computed and stored first if there is none.
    pub fn distribution(&self) -> Result<Vec<CategoryShare>, MillError> {
        if let Some(node) = self.store.get(DISTRIBUTION)? {
            let stored: Result<Vec<CategoryShare>, _> = children(&node)
                .into_iter()
                .map(|(_, v)| serde_json::from_value(v.clone()))
                .collect();
            match stored {
                Ok(d) => return Ok(d),
                Err(e) => log::debug!("stored distribution is stale ({e}), recomputing"),
            }
        }
        self.refresh_distribution()
    }

    pub fn refresh_kpis(&self) -> Result<InventoryKpis, MillError> {
        let kpis = compute_kpis(&self.list_all()?, &now_iso());
        self.store.set(KPIS, &serde_json::to_value(&kpis)?)?;
        Ok(kpis)
    }

    pub fn kpis(&self) -> Result<InventoryKpis, MillError> {
        if let Some(node) = self.store.get(KPIS)? {
            match serde_json::from_value(node) {
                Ok(k) => return Ok(k),
                Err(e) => log::debug!("stored KPIs are stale ({e}), recomputing"),
            }
        }
        self.refresh_kpis()
    }

    pub fn low_stock_predictions(&self, today: NaiveDate) -> Result<Vec<StockPrediction>, MillError> {
        Ok(predict_low_stock(&self.list_all()?, today))
    }

    fn refresh_aggregates(&self) -> Result<(), MillError> {
        self.refresh_distribution()?;
        self.refresh_kpis()?;
        Ok(())
    }
}
