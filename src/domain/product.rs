// src/domain/product.rs
use serde::Serialize;
use serde_json::Value;

use crate::domain::fields::RawRecord;
use crate::domain::stock::CatalogAvailability;
use crate::errors::MillError;

/// A product as the dealer catalog sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogProduct {
    /// Document id in the `products` collection.
    pub doc_id: String,
    /// Business id; older documents keep it in an `id` field that differs
    /// from the document id.
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub stock_quantity: f64,
    pub price: f64,
    pub availability: CatalogAvailability,
    pub updated_at: Option<String>,
}

impl CatalogProduct {
    pub fn from_raw(doc_id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(doc_id, raw)?;
        let stock_quantity = rec
            .number(&["stock_quantity", "stockQuantity", "current_stock", "currentStock"])
            .unwrap_or(0.0);

        Ok(CatalogProduct {
            doc_id: doc_id.to_string(),
            id: rec.text(&["id"]).unwrap_or_else(|| doc_id.to_string()),
            name: rec.require_text(&["name", "product_name", "riceName"], "name")?,
            category: rec.text(&["category", "type"]),
            stock_quantity,
            price: rec
                .number(&["price", "price_per_kg", "pricePerKg"])
                .unwrap_or(0.0),
            availability: CatalogAvailability::from_quantity(stock_quantity),
            updated_at: rec.text(&["updated_at", "updatedAt"]),
        })
    }
}
