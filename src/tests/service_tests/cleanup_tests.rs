use serde_json::json;

use crate::cleanup::{self, CleanupOptions};
use crate::db::Database;
use crate::store::TreeStore;
use crate::tests::utils::make_test_db;

fn seeded_db(prefix: &str) -> Database {
    let db = make_test_db(prefix);
    db.set(
        "workers",
        &json!({
            "w1": {"id": "W001", "name": "Kamal Perera", "salary": 30000, "bankAccount": "8001"},
            "w2": {"id": "W1700000123", "name": "Test Worker", "salary": "Rs. 32,000"},
            "w3": {"id": "W002", "name": "Demo", "seed": true},
            "w4": 42,
        }),
    )
    .unwrap();
    db.set(
        "salaries/2024-09",
        &json!({
            "W001": {"basicSalary": 30000},
            "W1700000123": {"basicSalary": 32000},
            "W002": {"basicSalary": 26000},
        }),
    )
    .unwrap();
    db
}

#[test]
fn dry_run_reports_without_writing() {
    let db = seeded_db("cleanup_dry");
    let before = db.get("").unwrap();

    let report = cleanup::run(
        &db,
        &CleanupOptions {
            month: Some("2024-09".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let mut flagged: Vec<&str> = report
        .candidates
        .iter()
        .map(|c| c.key.as_str())
        .collect();
    flagged.sort();
    assert_eq!(flagged, vec!["w2", "w3"]);
    assert_eq!(report.scanned, 4);
    assert_eq!(report.undecodable, vec!["w4".to_string()]);
    assert!(report.deleted.is_empty());
    assert_eq!(db.get("").unwrap(), before);
}

#[test]
fn delete_removes_exactly_the_flagged_workers_and_salaries() {
    let db = seeded_db("cleanup_delete");

    let report = cleanup::run(
        &db,
        &CleanupOptions {
            delete: true,
            month: Some("2024-09".into()),
            marker_only: false,
        },
    )
    .unwrap();
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.salaries_deleted.len(), 2);
    assert!(report.failures.is_empty());

    let workers = db.get("workers").unwrap().unwrap();
    let mut left: Vec<&String> = workers.as_object().unwrap().keys().collect();
    left.sort();
    assert_eq!(left, vec!["w1", "w4"]);

    let salaries = db.get("salaries/2024-09").unwrap().unwrap();
    assert_eq!(salaries.as_object().unwrap().len(), 1);
    assert!(salaries.get("W001").is_some());
}

#[test]
fn marker_only_keeps_legacy_lookalikes() {
    let db = seeded_db("cleanup_marker");
    let report = cleanup::run(
        &db,
        &CleanupOptions {
            delete: true,
            month: None,
            marker_only: true,
        },
    )
    .unwrap();
    assert_eq!(report.deleted, vec!["w3".to_string()]);
    assert!(db.get("workers/w2").unwrap().is_some());
    assert!(db.get("salaries/2024-09/W002").unwrap().is_some());
}

#[test]
fn bad_month_stops_before_any_delete() {
    let db = seeded_db("cleanup_month");
    let result = cleanup::run(
        &db,
        &CleanupOptions {
            delete: true,
            month: Some("09/2024".into()),
            marker_only: false,
        },
    );
    assert!(result.is_err());
    assert!(db.get("workers/w3").unwrap().is_some());
}

#[test]
fn workers_with_unfamiliar_status_are_still_classified() {
    let db = make_test_db("cleanup_legacy_status");
    db.set(
        "workers",
        &json!({
            "x": {"name": "A", "status": "On Duty", "salary": "Rs. 32,000"},
            "y": {"name": "B", "status": "On Duty", "salary": 32000, "bankAccount": "1"},
        }),
    )
    .unwrap();

    let report = cleanup::run(
        &db,
        &CleanupOptions {
            delete: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(report.undecodable.is_empty());
    assert_eq!(report.deleted, vec!["x".to_string()]);
    assert!(db.get("workers/y").unwrap().is_some());
}
