use serde_json::json;

use crate::domain::inventory::{ItemUpdate, NewInventoryItem};
use crate::domain::stock::StockStatus;
use crate::services::inventory::{InventoryService, KPIS, STOCK_UPDATES};
use crate::store::TreeStore;
use crate::tests::utils::make_test_db;

fn new_item(name: &str, bags: f64, min: f64, price: f64) -> NewInventoryItem {
    NewInventoryItem {
        name: name.into(),
        rice_type: name.into(),
        bags,
        kg_per_bag: Some(50.0),
        min_stock_level: Some(min),
        warehouse: Some("Warehouse A".into()),
        price_per_kg: price,
        ..Default::default()
    }
}

#[test]
fn add_update_delete_keeps_kpis_current() {
    let db = make_test_db("inventory_flow");
    let inventory = InventoryService::new(&db);

    let nadu = inventory.add_item(new_item("Nadu", 20.0, 1000.0, 100.0)).unwrap();
    let samba = inventory.add_item(new_item("Keeri Samba", 3.0, 1000.0, 200.0)).unwrap();
    assert_eq!(nadu.status, StockStatus::InStock);
    assert_eq!(samba.current_stock, 150.0);
    assert_eq!(samba.status, StockStatus::Critical);

    let kpis = inventory.kpis().unwrap();
    assert_eq!(kpis.total_bags, 23.0);
    assert_eq!(kpis.total_kg, 1150.0);
    assert_eq!(kpis.low_stock_items, 1);
    assert_eq!(kpis.out_of_stock_items, 0);
    assert_eq!(kpis.active_warehouses, 1);

    let emptied = inventory
        .update_item(
            &samba.id,
            ItemUpdate {
                current_stock: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(emptied.status, StockStatus::OutOfStock);

    // The stored copy is what a dashboard would read.
    let stored = db.get(KPIS).unwrap().unwrap();
    assert_eq!(stored["outOfStockItems"], 1);
    assert_eq!(stored["lowStockItems"], 0);

    let movements = inventory.recent_movements(10).unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].item_id, samba.id);
    assert_eq!(movements[0].quantity, -150.0);

    inventory.delete_item(&nadu.id).unwrap();
    let remaining = inventory.list_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Keeri Samba");
    assert_eq!(inventory.kpis().unwrap().total_bags, 3.0);

    let distribution = inventory.distribution().unwrap();
    assert_eq!(distribution.len(), 1);
    assert_eq!(distribution[0].category, "Keeri Samba");
}

#[test]
fn missing_items_and_bad_input_are_rejected() {
    let db = make_test_db("inventory_errors");
    let inventory = InventoryService::new(&db);

    assert!(inventory.delete_item("nope").is_err());
    assert!(inventory.update_item("nope", ItemUpdate::default()).is_err());
    assert!(inventory.add_item(new_item("  ", 1.0, 10.0, 1.0)).is_err());
    assert!(inventory.add_item(new_item("Nadu", -1.0, 10.0, 1.0)).is_err());
    assert!(db.get(STOCK_UPDATES).unwrap().is_none());
}

#[test]
fn undecodable_items_are_skipped_not_fatal() {
    let db = make_test_db("inventory_skip");
    db.set(
        "products",
        &serde_json::json!({
            "good": {"name": "Nadu", "current_stock": 400, "minStockLevel": 1000},
            "bad": "not a record",
        }),
    )
    .unwrap();

    let items = InventoryService::new(&db).list_all().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, StockStatus::LowStock);
}

#[test]
fn movements_are_ordered_by_time_not_text() {
    let db = make_test_db("inventory_movement_order");
    db.set(
        STOCK_UPDATES,
        &json!({
            "m1": {"itemId": "a", "type": "in", "quantity": 10, "timestamp": "2024-09-15T10:00:00.000Z"},
            "m2": {"itemId": "a", "type": "in", "quantity": 20, "timestamp": "2024-09-15T14:00:00+05:30"},
            "m3": {"itemId": "a", "type": "out", "quantity": 5, "timestamp": "2024-09-16 08:00:00"},
            "m4": {"itemId": "a", "type": "out", "quantity": 1},
        }),
    )
    .unwrap();

    let ids: Vec<String> = InventoryService::new(&db)
        .recent_movements(10)
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["m3", "m1", "m2", "m4"]);
}
