use serde_json::json;

use crate::db::Database;
use crate::domain::transport::{
    check_order_unassigned, check_vehicle_available, TripAssignment, TripStatus,
};
use crate::errors::MillError;
use crate::services::transport::TransportService;
use crate::store::TreeStore;
use crate::tests::utils::make_test_db;

fn fleet(prefix: &str) -> Database {
    let db = make_test_db(prefix);
    db.set(
        "vehicles",
        &json!({
            "veh_001": {"vehicleNumber": "CAB-1234", "capacity": 5000, "status": "Available"},
            "veh_002": {"vehicleNumber": "CAC-5678", "capacity": 2000, "status": "On Delivery"},
            "veh_003": {"vehicleNumber": "CAD-9012", "capacity": "1 ton", "status": "Available"},
        }),
    )
    .unwrap();
    db.set(
        "drivers",
        &json!({
            "drv_001": {"name": "Kamal Silva", "isAvailable": true},
            "drv_002": {"name": "Nimal Fernando", "isAvailable": true},
            "drv_003": {"name": "Sunil Jayawardena", "isAvailable": false},
        }),
    )
    .unwrap();
    db.set(
        "trips/trip_001",
        &json!({"tripId": "TRP-001", "orderId": "ORD-1", "vehicleId": "veh_002",
                "driverId": "drv_002", "endLocation": "Kandy", "status": "in-transit",
                "estimatedDistance": 115}),
    )
    .unwrap();
    db
}

fn assignment(order: &str, vehicle: &str, driver: &str, qty: f64) -> TripAssignment {
    TripAssignment {
        order_id: order.into(),
        vehicle_id: vehicle.into(),
        driver_id: driver.into(),
        start_location: Some("Warehouse A".into()),
        end_location: "Galle".into(),
        quantity_kg: Some(qty),
    }
}

fn rejection(result: Result<(String, crate::domain::transport::Validation), MillError>) -> String {
    match result {
        Err(MillError::BadRequest(msg)) => msg,
        other => panic!("expected a rejected assignment, got {other:?}"),
    }
}

#[test]
fn assign_then_complete_a_trip() {
    let db = fleet("transport_flow");
    let transport = TransportService::new(&db);

    let (key, validation) = transport
        .assign_trip(&assignment("ORD-2", "veh_001", "drv_001", 4600.0))
        .unwrap();
    // 92% of capacity passes with a warning.
    assert_eq!(validation.warnings.len(), 1);
    assert_eq!(
        db.get(&format!("trips/{key}/status")).unwrap(),
        Some(json!("assigned"))
    );

    let done = transport.complete_delivery(&key).unwrap();
    assert_eq!(done.status, TripStatus::Delivered);
    assert!(done.completed_at.is_some());
    let history = db.get(&format!("transportHistory/{key}")).unwrap().unwrap();
    assert_eq!(history["status"], json!("Delivered"));
    assert_eq!(history["orderId"], json!("ORD-2"));

    let stats = transport.stats().unwrap();
    assert_eq!(stats.total_trips, 2);
    assert_eq!(stats.completed_trips, 1);
    assert_eq!(stats.in_transit_trips, 1);
    assert_eq!(stats.completion_rate, 50);

    // The delivered trip no longer holds its vehicle.
    transport
        .assign_trip(&assignment("ORD-3", "veh_001", "drv_001", 1000.0))
        .unwrap();
}

#[test]
fn busy_unavailable_and_overloaded_assignments_are_rejected() {
    let db = fleet("transport_rejects");
    let transport = TransportService::new(&db);

    let busy = rejection(transport.assign_trip(&assignment("ORD-2", "veh_002", "drv_001", 100.0)));
    assert!(busy.contains("Vehicle is already assigned to trip TRP-001"));

    let same_order = rejection(transport.assign_trip(&assignment("ORD-1", "veh_001", "drv_001", 100.0)));
    assert!(same_order.contains("Order is already assigned"));

    let off_duty = rejection(transport.assign_trip(&assignment("ORD-2", "veh_001", "drv_003", 100.0)));
    assert!(off_duty.contains("marked as unavailable"));

    let heavy = rejection(transport.assign_trip(&assignment("ORD-2", "veh_003", "drv_001", 1500.0)));
    assert!(heavy.contains("exceeds vehicle capacity"));

    assert_eq!(transport.trips().unwrap().len(), 1);
    assert!(matches!(
        transport.complete_delivery("nope"),
        Err(MillError::NotFound(_))
    ));
}

#[test]
fn live_status_covers_only_active_trips() {
    let db = fleet("transport_live");
    db.set(
        "trips/trip_000",
        &json!({"tripId": "TRP-000", "status": "Delivered"}),
    )
    .unwrap();

    let live = TransportService::new(&db).live_status(1_700_000_000_000).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].0.trip_id, "TRP-001");
    assert!(!live[0].1.is_online());
}

#[test]
fn legacy_trip_statuses_do_not_hold_vehicles() {
    let db = fleet("transport_legacy");
    db.set(
        "trips/trip_009",
        &json!({"tripId": "TRP-009", "orderId": "ORD-9", "vehicleId": "veh_001",
                "driverId": "drv_001", "status": "active"}),
    )
    .unwrap();
    db.set(
        "trips/trip_010",
        &json!({"tripId": "TRP-010", "orderId": "ORD-10", "vehicleId": "veh_003",
                "status": "pending"}),
    )
    .unwrap();

    let transport = TransportService::new(&db);
    transport
        .assign_trip(&assignment("ORD-9", "veh_001", "drv_001", 1000.0))
        .unwrap();
    let trips = transport.trips().unwrap();
    assert!(check_vehicle_available("veh_003", &trips).is_ok());
    assert!(check_order_unassigned("ORD-10", &trips).is_ok());

    // `active` still counts as on the road.
    assert_eq!(transport.stats().unwrap().in_transit_trips, 2);
}
