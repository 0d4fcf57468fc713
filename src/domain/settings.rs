// src/domain/settings.rs
use serde::{Deserialize, Serialize};

/// The `system_settings` node. Written by hand in the console as often as by
/// code, so every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub app_name: String,
    pub currency: String,
    pub min_order_kg: f64,
    pub delivery_fee_per_km: f64,
    pub tax_percentage: f64,
    pub default_warehouse: String,
    pub low_stock_alerts: bool,
    pub support_phone: Option<String>,
    pub support_email: Option<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        SystemSettings {
            app_name: "Rice Mill Management System".to_string(),
            currency: "LKR".to_string(),
            min_order_kg: 25.0,
            delivery_fee_per_km: 50.0,
            tax_percentage: 15.0,
            default_warehouse: crate::domain::inventory::DEFAULT_WAREHOUSE.to_string(),
            low_stock_alerts: true,
            support_phone: None,
            support_email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_node_fills_defaults() {
        let s: SystemSettings =
            serde_json::from_value(json!({"currency": "LKR", "tax_percentage": 8})).unwrap();
        assert_eq!(s.tax_percentage, 8.0);
        assert_eq!(s.min_order_kg, 25.0);
        assert!(s.low_stock_alerts);
    }
}
