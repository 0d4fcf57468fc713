// src/domain/order.rs
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::fields::{children, number_value, RawRecord};
use crate::errors::MillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrderStatus {
    Pending,
    Approved,
    Processing,
    #[serde(rename = "Pending Transport")]
    PendingTransport,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Approved => "Approved",
            OrderStatus::Processing => "Processing",
            OrderStatus::PendingTransport => "Pending Transport",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let status = match key.as_str() {
            "pending" | "new" | "placed" => OrderStatus::Pending,
            "approved" | "acknowledged" | "confirmed" => OrderStatus::Approved,
            "processing" => OrderStatus::Processing,
            "pending transport" => OrderStatus::PendingTransport,
            "in transit" | "shipped" => OrderStatus::InTransit,
            "delivered" => OrderStatus::Delivered,
            "completed" | "paid" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "rejected" => OrderStatus::Rejected,
            _ => return None,
        };
        Some(status)
    }

    /// Still moving through the mill; not delivered, completed or dropped.
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl OrderLine {
    fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;
        Ok(OrderLine {
            product_id: rec.text(&["productId", "product_id", "id"]),
            name: rec
                .text(&["name", "productName", "product_name"])
                .unwrap_or_default(),
            quantity: rec.number(&["quantity", "qty"]).unwrap_or(0.0),
            unit_price: rec
                .number(&["price", "unitPrice", "unit_price", "price_per_kg"])
                .unwrap_or(0.0),
        })
    }

    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }

    fn to_value(&self) -> Value {
        json!({
            "productId": self.product_id,
            "name": self.name,
            "quantity": number_value(self.quantity),
            "price": number_value(self.unit_price),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub dealer_id: Option<String>,
    pub dealer_name: Option<String>,
    pub dealer_email: Option<String>,
    pub items: Vec<OrderLine>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Order {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;

        let status = match rec.text(&["status", "orderStatus"]) {
            Some(s) => OrderStatus::parse(&s)
                .ok_or_else(|| MillError::invalid(id, format!("unknown order status '{s}'")))?,
            None => OrderStatus::Pending,
        };

        let items = match rec.raw(&["items", "products"]) {
            Some(node) => children(node)
                .into_iter()
                .map(|(k, v)| OrderLine::from_raw(&format!("{id}/items/{k}"), v))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let total_amount = rec
            .number(&["totalAmount", "total_amount", "total"])
            .unwrap_or_else(|| items.iter().map(OrderLine::line_total).sum());

        Ok(Order {
            id: rec.text(&["id", "orderId"]).unwrap_or_else(|| id.to_string()),
            dealer_id: rec.text(&["dealerId", "dealer_id"]),
            dealer_name: rec.text(&["dealerName", "dealer_name", "customerName"]),
            dealer_email: rec.text(&["dealerEmail", "dealer_email"]),
            items,
            total_amount,
            status,
            created_at: rec.text(&["created_at", "createdAt", "orderDate"]),
            updated_at: rec.text(&["updated_at", "updatedAt"]),
        })
    }
}

/// Order placed from the dealer catalog.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub dealer_id: String,
    pub dealer_name: Option<String>,
    pub dealer_email: Option<String>,
    pub items: Vec<OrderLine>,
}

impl NewOrder {
    pub fn to_fields(&self, id: &str, now: &str) -> Result<Map<String, Value>, MillError> {
        if self.dealer_id.trim().is_empty() {
            return Err(MillError::BadRequest("an order needs a dealer".into()));
        }
        if self.items.is_empty() || self.items.iter().any(|l| l.quantity <= 0.0) {
            return Err(MillError::BadRequest(
                "an order needs at least one line with a positive quantity".into(),
            ));
        }

        let total: f64 = self.items.iter().map(OrderLine::line_total).sum();
        let mut fields = Map::new();
        fields.insert("id".into(), json!(id));
        fields.insert("dealerId".into(), json!(self.dealer_id));
        if let Some(name) = &self.dealer_name {
            fields.insert("dealerName".into(), json!(name));
        }
        if let Some(email) = &self.dealer_email {
            fields.insert("dealerEmail".into(), json!(email));
        }
        fields.insert(
            "items".into(),
            Value::Array(self.items.iter().map(OrderLine::to_value).collect()),
        );
        fields.insert("totalAmount".into(), number_value(total));
        fields.insert("status".into(), json!(OrderStatus::Pending.as_str()));
        fields.insert("created_at".into(), json!(now));
        fields.insert("updated_at".into(), json!(now));
        Ok(fields)
    }
}
