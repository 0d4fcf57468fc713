// src/domain/inventory.rs
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::fields::{number_value, RawRecord};
use crate::domain::stock::StockStatus;
use crate::errors::MillError;

pub const DEFAULT_KG_PER_BAG: f64 = 50.0;
pub const DEFAULT_MIN_STOCK: f64 = 1000.0;
pub const DEFAULT_WAREHOUSE: &str = "Warehouse A";
pub const DEFAULT_QUALITY_SCORE: f64 = 95.0;
pub const UNCATEGORIZED: &str = "Uncategorized";

// Alias lists, canonical name first.
const NAME: &[&str] = &["name", "riceName", "product_name"];
const TYPE: &[&str] = &["type", "category", "riceType", "rice_type"];
const GRADE: &[&str] = &["grade"];
const BAGS: &[&str] = &["bags", "Bags"];
const KG_PER_BAG: &[&str] = &["kg_per_bag", "kgPerBag"];
const TOTAL_KG: &[&str] = &["total_kg", "totalKg"];
const CURRENT_STOCK: &[&str] = &["current_stock", "currentStock", "stock_quantity"];
const MIN_STOCK: &[&str] = &["min_stock_level", "minStockLevel", "minimumStock"];
const WAREHOUSE: &[&str] = &["warehouse"];
const PRICE_PER_KG: &[&str] = &["price_per_kg", "pricePerKg", "price"];
const LAST_UPDATED: &[&str] = &["updated_at", "lastUpdated", "created_at"];
const IMAGE: &[&str] = &["image"];
const QUALITY: &[&str] = &["quality_score", "qualityScore"];
const OWNER: &[&str] = &["owner_email", "ownerEmail"];
const SEED: &[&str] = &["seed"];

/// A stocked product after field reconciliation, with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub rice_type: String,
    pub grade: Option<String>,
    pub bags: f64,
    pub kg_per_bag: f64,
    pub total_kg: f64,
    pub current_stock: f64,
    pub min_stock_level: f64,
    pub warehouse: String,
    pub price_per_kg: f64,
    pub last_updated: Option<String>,
    pub status: StockStatus,
    pub image: Option<String>,
    pub quality_score: Option<f64>,
    pub owner_email: Option<String>,
    pub seed: bool,
}

impl InventoryItem {
    /// Decode a raw `products/<id>` record. The stored status field is ignored;
    /// status is always derived from stock and minimum level.
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;

        let name = rec.require_text(NAME, "name")?;
        let bags = rec.number(BAGS).unwrap_or(0.0);
        let kg_per_bag = rec
            .number(KG_PER_BAG)
            .filter(|k| *k > 0.0)
            .unwrap_or(DEFAULT_KG_PER_BAG);
        let total_kg = rec.number(TOTAL_KG).unwrap_or(bags * kg_per_bag);
        let current_stock = rec.number(CURRENT_STOCK).unwrap_or(0.0);
        let min_stock_level = rec.number(MIN_STOCK).unwrap_or(DEFAULT_MIN_STOCK);

        Ok(InventoryItem {
            id: id.to_string(),
            name,
            rice_type: rec.text(TYPE).unwrap_or_else(|| UNCATEGORIZED.to_string()),
            grade: rec.text(GRADE),
            bags,
            kg_per_bag,
            total_kg,
            current_stock,
            min_stock_level,
            warehouse: rec
                .text(WAREHOUSE)
                .unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string()),
            price_per_kg: rec.number(PRICE_PER_KG).unwrap_or(0.0),
            last_updated: rec.text(LAST_UPDATED),
            status: StockStatus::classify(current_stock, min_stock_level),
            image: rec.text(IMAGE),
            quality_score: rec.number(QUALITY),
            owner_email: rec.text(OWNER),
            seed: rec.boolean(SEED).unwrap_or(false),
        })
    }

    /// Stock as a fraction of the minimum level. Zero minimum reads as the default.
    pub fn stock_ratio(&self) -> f64 {
        let min = if self.min_stock_level > 0.0 {
            self.min_stock_level
        } else {
            DEFAULT_MIN_STOCK
        };
        self.current_stock / min
    }

    pub fn stock_value(&self) -> f64 {
        self.current_stock * self.price_per_kg
    }

    /// Canonical record written back to the store.
    ///
    /// Stock level, minimum and status are written under both naming
    /// conventions, since older screens still read the camelCase ones.
    pub fn to_record(&self) -> Value {
        let mut rec = Map::new();
        rec.insert("id".into(), json!(self.id));
        rec.insert("name".into(), json!(self.name));
        rec.insert("type".into(), json!(self.rice_type));
        if let Some(grade) = &self.grade {
            rec.insert("grade".into(), json!(grade));
        }
        rec.insert("bags".into(), number_value(self.bags));
        rec.insert("kg_per_bag".into(), number_value(self.kg_per_bag));
        rec.insert("total_kg".into(), number_value(self.total_kg));
        rec.insert("current_stock".into(), number_value(self.current_stock));
        rec.insert("currentStock".into(), number_value(self.current_stock));
        rec.insert("min_stock_level".into(), number_value(self.min_stock_level));
        rec.insert("minStockLevel".into(), number_value(self.min_stock_level));
        rec.insert("warehouse".into(), json!(self.warehouse));
        rec.insert("price_per_kg".into(), number_value(self.price_per_kg));
        if let Some(updated) = &self.last_updated {
            rec.insert("updated_at".into(), json!(updated));
        }
        rec.insert("stock_status".into(), json!(self.status.as_str()));
        rec.insert("status".into(), json!(self.status.as_str()));
        if let Some(image) = &self.image {
            rec.insert("image".into(), json!(image));
        }
        if let Some(q) = self.quality_score {
            rec.insert("quality_score".into(), number_value(q));
        }
        if let Some(owner) = &self.owner_email {
            rec.insert("owner_email".into(), json!(owner));
        }
        if self.seed {
            rec.insert("seed".into(), json!(true));
        }
        Value::Object(rec)
    }
}

/// Input for a new inventory item.
#[derive(Debug, Clone, Default)]
pub struct NewInventoryItem {
    pub name: String,
    pub rice_type: String,
    pub grade: Option<String>,
    pub bags: f64,
    pub kg_per_bag: Option<f64>,
    /// Direct kilogram input; when absent the stock is `bags * kg_per_bag`.
    pub current_stock: Option<f64>,
    pub min_stock_level: Option<f64>,
    pub warehouse: Option<String>,
    pub price_per_kg: f64,
    pub quality_score: Option<f64>,
    pub image: Option<String>,
    pub owner_email: Option<String>,
    pub seed: bool,
}

impl NewInventoryItem {
    pub fn validate(&self) -> Result<(), MillError> {
        if self.name.trim().is_empty() {
            return Err(MillError::BadRequest("item name is required".into()));
        }
        if self.bags < 0.0 || self.price_per_kg < 0.0 || self.current_stock.unwrap_or(0.0) < 0.0 {
            return Err(MillError::BadRequest(
                "bags, stock and price must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn into_item(self, id: String, now: &str) -> InventoryItem {
        let kg_per_bag = self
            .kg_per_bag
            .filter(|k| *k > 0.0)
            .unwrap_or(DEFAULT_KG_PER_BAG);
        let total_kg = self.bags * kg_per_bag;
        let current_stock = self.current_stock.unwrap_or(total_kg);
        let min_stock_level = self.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK);
        let rice_type = match self.rice_type.trim() {
            "" => UNCATEGORIZED.to_string(),
            t => t.to_string(),
        };

        InventoryItem {
            id,
            name: self.name.trim().to_string(),
            rice_type,
            grade: self.grade,
            bags: self.bags,
            kg_per_bag,
            total_kg,
            current_stock,
            min_stock_level,
            warehouse: self
                .warehouse
                .unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string()),
            price_per_kg: self.price_per_kg,
            last_updated: Some(now.to_string()),
            status: StockStatus::classify(current_stock, min_stock_level),
            image: self.image,
            quality_score: Some(self.quality_score.unwrap_or(DEFAULT_QUALITY_SCORE)),
            owner_email: self.owner_email,
            seed: self.seed,
        }
    }
}

/// Edit form input; `None` leaves a field as stored.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub rice_type: Option<String>,
    pub grade: Option<String>,
    pub bags: Option<f64>,
    pub kg_per_bag: Option<f64>,
    pub current_stock: Option<f64>,
    pub min_stock_level: Option<f64>,
    pub warehouse: Option<String>,
    pub price_per_kg: Option<f64>,
    pub quality_score: Option<f64>,
    pub image: Option<String>,
}

impl InventoryItem {
    /// Apply an edit. Total kg follows bags and bag weight, and the status is
    /// derived again.
    pub fn apply(&mut self, update: ItemUpdate, now: &str) -> Result<(), MillError> {
        let negative = [update.bags, update.current_stock, update.price_per_kg]
            .into_iter()
            .flatten()
            .any(|n| n < 0.0);
        if negative {
            return Err(MillError::BadRequest(
                "bags, stock and price must not be negative".into(),
            ));
        }

        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            self.name = name.trim().to_string();
        }
        if let Some(t) = update.rice_type.filter(|t| !t.trim().is_empty()) {
            self.rice_type = t.trim().to_string();
        }
        if update.grade.is_some() {
            self.grade = update.grade;
        }
        if let Some(bags) = update.bags {
            self.bags = bags;
        }
        if let Some(k) = update.kg_per_bag.filter(|k| *k > 0.0) {
            self.kg_per_bag = k;
        }
        if let Some(stock) = update.current_stock {
            self.current_stock = stock;
        }
        if let Some(min) = update.min_stock_level {
            self.min_stock_level = min;
        }
        if let Some(w) = update.warehouse {
            self.warehouse = w;
        }
        if let Some(p) = update.price_per_kg {
            self.price_per_kg = p;
        }
        if update.quality_score.is_some() {
            self.quality_score = update.quality_score;
        }
        if update.image.is_some() {
            self.image = update.image;
        }

        self.total_kg = self.bags * self.kg_per_bag;
        self.status = StockStatus::classify(self.current_stock, self.min_stock_level);
        self.last_updated = Some(now.to_string());
        Ok(())
    }
}

/// A row in `stock_updates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockMovement {
    pub id: String,
    pub item_id: String,
    pub item_name: Option<String>,
    pub kind: String,
    pub quantity: f64,
    pub warehouse: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub timestamp: Option<String>,
    pub user: String,
}

impl StockMovement {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;
        Ok(StockMovement {
            id: id.to_string(),
            item_id: rec
                .text(&["itemId", "item_id", "productId", "product_id"])
                .unwrap_or_default(),
            item_name: rec.text(&["itemName", "item_name", "productName", "product_name"]),
            kind: rec
                .text(&["type", "movement_type"])
                .unwrap_or_else(|| "update".to_string()),
            quantity: rec.number(&["quantity", "quantity_kg"]).unwrap_or(0.0),
            warehouse: rec.text(&["warehouse"]),
            from: rec.text(&["from"]),
            to: rec.text(&["to"]),
            timestamp: rec.text(&["timestamp", "created_at", "createdAt"]),
            user: rec.text(&["user"]).unwrap_or_else(|| "System".to_string()),
        })
    }

    pub fn to_record(&self) -> Value {
        json!({
            "itemId": self.item_id,
            "itemName": self.item_name,
            "type": self.kind,
            "quantity": number_value(self.quantity),
            "warehouse": self.warehouse,
            "from": self.from,
            "to": self.to,
            "timestamp": self.timestamp,
            "created_at": self.timestamp,
            "user": self.user,
        })
    }
}
