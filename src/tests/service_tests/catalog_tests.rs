use serde_json::{json, Map, Value};

use crate::domain::dealer::CreditUpdate;
use crate::domain::order::{NewOrder, OrderLine, OrderStatus};
use crate::domain::stock::CatalogAvailability;
use crate::errors::MillError;
use crate::services::dealers::DealerService;
use crate::services::products::{ProductService, PRODUCTS};
use crate::store::DocumentStore;
use crate::tests::utils::make_test_db;

fn fields(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

#[test]
fn selling_stock_updates_availability_and_refuses_oversell() {
    let db = make_test_db("catalog_stock");
    db.set(
        PRODUCTS,
        "doc-basmati",
        &fields(json!({"id": "P-100", "name": "Basmati Rice", "stock_quantity": 250, "price": 410})),
    )
    .unwrap();

    let products = ProductService::new(&db);
    // Found through the `id` field, not the document id.
    let found = products.by_id("P-100").unwrap().unwrap();
    assert_eq!(found.doc_id, "doc-basmati");
    assert_eq!(found.availability, CatalogAvailability::Available);

    assert_eq!(products.update_stock("P-100", 200.0).unwrap(), 50.0);
    let after = products.by_id("doc-basmati").unwrap().unwrap();
    assert_eq!(after.stock_quantity, 50.0);
    assert_eq!(after.availability, CatalogAvailability::Low);

    let err = products.update_stock("P-100", 60.0).unwrap_err();
    assert!(matches!(err, MillError::InsufficientStock { .. }));
    assert_eq!(products.by_id("P-100").unwrap().unwrap().stock_quantity, 50.0);

    assert!(matches!(
        products.update_stock("missing", 1.0),
        Err(MillError::NotFound(_))
    ));
}

#[test]
fn orders_are_listed_per_dealer() {
    let db = make_test_db("catalog_orders");
    let products = ProductService::new(&db);

    let order = NewOrder {
        dealer_id: "dealer-1".into(),
        dealer_name: Some("Dealer Ravi".into()),
        dealer_email: None,
        items: vec![OrderLine {
            product_id: Some("P-100".into()),
            name: "Basmati Rice".into(),
            quantity: 100.0,
            unit_price: 410.0,
        }],
    };
    let id = products.create_order(&order).unwrap();
    assert!(id.starts_with("ORD-"));

    let orders = products.dealer_orders("dealer-1").unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_amount, 41_000.0);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert!(products.dealer_orders("dealer-2").unwrap().is_empty());

    let empty = NewOrder {
        dealer_id: "dealer-1".into(),
        ..Default::default()
    };
    assert!(products.create_order(&empty).is_err());
}

#[test]
fn unknown_dealers_fall_back_to_guest() {
    let db = make_test_db("catalog_dealers");
    db.set(
        "dealers",
        "d1",
        &fields(json!({"uid": "user-1", "name": "Perera Stores", "creditLimit": 200000, "creditUsed": 50000})),
    )
    .unwrap();

    let dealers = DealerService::new(&db);
    let known = dealers.by_uid("user-1").unwrap();
    assert_eq!(known.name, "Perera Stores");
    assert_eq!(known.credit_remaining, 150_000.0);

    let guest = dealers.by_uid("someone-else").unwrap();
    assert!(guest.is_guest());

    let updated = dealers
        .update_credit(
            "user-1",
            CreditUpdate {
                credit_limit: 300_000.0,
                credit_used: 50_000.0,
            },
        )
        .unwrap();
    assert_eq!(updated.credit_remaining, 250_000.0);
    let stored = DocumentStore::get(&db, "dealers", "d1").unwrap().unwrap();
    assert_eq!(stored.data["creditRemaining"], json!(250000));

    assert!(matches!(
        dealers.update_credit("someone-else", CreditUpdate { credit_limit: 1.0, credit_used: 0.0 }),
        Err(MillError::NotFound(_))
    ));
}

#[test]
fn placing_an_order_records_it_and_takes_stock() {
    let db = make_test_db("catalog_place_order");
    db.set(
        PRODUCTS,
        "doc-nadu",
        &fields(json!({"id": "P-200", "name": "Nadu 25kg", "stock_quantity": 300, "price": 220})),
    )
    .unwrap();
    db.set(
        "dealers",
        "dealer-doc",
        &fields(json!({"uid": "u-77", "name": "Perera Stores", "email": "perera@example.lk"})),
    )
    .unwrap();

    let dealer = DealerService::new(&db).by_uid("u-77").unwrap();
    let products = ProductService::new(&db);

    let id = products.place_order(&dealer, "P-200", 120.0).unwrap();
    let orders = products.dealer_orders("u-77").unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, id);
    assert_eq!(orders[0].dealer_name.as_deref(), Some("Perera Stores"));
    assert_eq!(orders[0].total_amount, 26_400.0);
    assert_eq!(products.by_id("P-200").unwrap().unwrap().stock_quantity, 180.0);

    let err = products.place_order(&dealer, "P-200", 500.0).unwrap_err();
    assert!(matches!(err, MillError::InsufficientStock { .. }));
    assert_eq!(products.dealer_orders("u-77").unwrap().len(), 1);
}
