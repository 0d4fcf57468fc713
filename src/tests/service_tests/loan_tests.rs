use chrono::NaiveDate;
use serde_json::json;

use crate::domain::loan::{LoanStatus, NewLoan};
use crate::services::loans::LoanService;
use crate::store::TreeStore;
use crate::tests::utils::make_test_db;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn payments_move_a_loan_to_repaid() {
    let db = make_test_db("loan_payments");
    let loans = LoanService::new(&db);

    let loan = loans
        .add_loan(
            NewLoan {
                customer: "Perera Stores".into(),
                rice_type: "Nadu".into(),
                quantity: 500.0,
                amount: 100_000.0,
                issue_date: None,
                due_date: Some(day(2024, 3, 1)),
            },
            day(2024, 1, 1),
        )
        .unwrap();
    assert!(loan.id.starts_with("LN-"));
    assert_eq!(loan.issue_date, Some(day(2024, 1, 1)));

    let after_due = day(2024, 4, 1);
    let summary = loans.summary(after_due).unwrap();
    assert_eq!(summary.overdue, 1);
    assert_eq!(summary.total_outstanding, 100_000.0);

    let partial = loans.record_payment(&loan.id, 40_000.0).unwrap();
    assert_eq!(partial.status, LoanStatus::PartiallyRepaid);
    assert_eq!(partial.outstanding(), 60_000.0);
    // Still past due, so the list shows it overdue.
    assert_eq!(loans.list(after_due).unwrap()[0].display_status, LoanStatus::Overdue);

    let repaid = loans.record_payment(&loan.id, 60_000.0).unwrap();
    assert_eq!(repaid.status, LoanStatus::FullyRepaid);

    let views = loans.list(after_due).unwrap();
    assert_eq!(views[0].display_status, LoanStatus::FullyRepaid);
    assert_eq!(views[0].outstanding, 0.0);
    assert!(loans.record_payment(&loan.id, 1.0).is_err());
}

#[test]
fn due_date_before_issue_is_rejected() {
    let db = make_test_db("loan_dates");
    let err = LoanService::new(&db).add_loan(
        NewLoan {
            customer: "Silva Traders".into(),
            rice_type: "Samba".into(),
            quantity: 100.0,
            amount: 5000.0,
            issue_date: Some(day(2024, 5, 10)),
            due_date: Some(day(2024, 5, 1)),
        },
        day(2024, 5, 10),
    );
    assert!(err.is_err());
    assert!(db.get("loans").unwrap().is_none());
}

#[test]
fn legacy_records_are_found_by_id_field() {
    let db = make_test_db("loan_legacy");
    db.set(
        "loans/-NlegacyKey",
        &json!({
            "id": "LN-old",
            "customerName": "Lanka Grains",
            "principal": 5000,
            "dueDate": "01/02/2024",
            "status": "issued",
        }),
    )
    .unwrap();
    db.set("loans/broken", &json!({"customer": "X", "status": "lost at sea"}))
        .unwrap();

    let loans = LoanService::new(&db);
    let views = loans.list(day(2024, 1, 15)).unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].display_status, LoanStatus::Active);

    let found = loans.filter("lanka", None, day(2024, 3, 1)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].display_status, LoanStatus::Overdue);

    loans.repay("LN-old").unwrap();
    assert_eq!(
        db.get("loans/-NlegacyKey/status").unwrap(),
        Some(json!("Fully Repaid"))
    );
}

#[test]
fn legacy_records_are_found_by_loan_id_field() {
    let db = make_test_db("loan_legacy_loanid");
    db.set(
        "loans/-NotherKey",
        &json!({"loanId": "LN-2023-07", "customer": "Perera Stores", "amount": 8000}),
    )
    .unwrap();

    let loans = LoanService::new(&db);
    let loan = loans.record_payment("LN-2023-07", 3000.0).unwrap();
    assert_eq!(loan.status, LoanStatus::PartiallyRepaid);
    assert_eq!(db.get("loans/-NotherKey/paidAmount").unwrap(), Some(json!(3000)));
}
