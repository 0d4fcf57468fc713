// src/fixtures.rs

//! Sample figures shown when live data is unavailable.

use crate::services::insights::StockRow;

pub fn stock_rows() -> Vec<StockRow> {
    vec![
        StockRow {
            product: "Basmati Rice".into(),
            category: "Premium Rice".into(),
            current_stock: 5600.0,
            min_stock: 3000.0,
            max_stock: Some(10000.0),
            daily_usage: 280.0,
            price: 150.0,
        },
        StockRow {
            product: "Sona Masoori".into(),
            category: "Regular Rice".into(),
            current_stock: 4200.0,
            min_stock: 2000.0,
            max_stock: Some(8000.0),
            daily_usage: 350.0,
            price: 120.0,
        },
    ]
}
