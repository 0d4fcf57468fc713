// src/domain/stock.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived stock level of an inventory item, relative to its minimum level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Critical")]
    Critical,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    InStock,
}

pub const CRITICAL_RATIO: f64 = 0.3;
pub const LOW_RATIO: f64 = 0.5;

impl StockStatus {
    /// Classifies an item by how much of its minimum level is on hand.
    /// The checks run in order, so an empty item is Out of Stock even when
    /// its minimum level is zero.
    pub fn classify(current_stock: f64, min_stock_level: f64) -> Self {
        if current_stock <= 0.0 {
            StockStatus::OutOfStock
        } else if current_stock <= min_stock_level * CRITICAL_RATIO {
            StockStatus::Critical
        } else if current_stock <= min_stock_level * LOW_RATIO {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Critical => "Critical",
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }

    /// Needs reordering but is not yet empty.
    pub fn is_low(&self) -> bool {
        matches!(self, StockStatus::Critical | StockStatus::LowStock)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units below which a catalog product shows as `Low`.
pub const CATALOG_LOW_THRESHOLD: f64 = 100.0;

/// Availability label of a product in the dealer-facing catalog.
///
/// The catalog uses an absolute threshold instead of a per-item minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogAvailability {
    Available,
    Low,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl CatalogAvailability {
    pub fn from_quantity(quantity: f64) -> Self {
        if quantity <= 0.0 {
            CatalogAvailability::OutOfStock
        } else if quantity < CATALOG_LOW_THRESHOLD {
            CatalogAvailability::Low
        } else {
            CatalogAvailability::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogAvailability::Available => "Available",
            CatalogAvailability::Low => "Low",
            CatalogAvailability::OutOfStock => "Out of Stock",
        }
    }
}
