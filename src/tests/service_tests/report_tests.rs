use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::seed::{self, SeedOptions};
use crate::spreadsheets::export_report;
use crate::tests::utils::{make_test_db, unique_temp_db_path};

#[test]
fn report_covers_seeded_data() {
    let db = make_test_db("report_seeded");
    let today = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();
    seed::run(&db, &SeedOptions::default(), today, &mut StdRng::seed_from_u64(3)).unwrap();

    let out = std::path::PathBuf::from(format!("{}.xlsx", unique_temp_db_path("report")));
    let counts = export_report(&db, &out, today).unwrap();
    assert_eq!(counts.inventory, 6);
    assert_eq!(counts.loans, 4);
    assert_eq!(counts.workers, 6);

    let bytes = std::fs::read(&out).unwrap();
    // XLSX is a zip archive.
    assert_eq!(&bytes[..2], b"PK");
    std::fs::remove_file(&out).ok();
}

#[test]
fn empty_store_still_produces_a_workbook() {
    let db = make_test_db("report_empty");
    let out = std::path::PathBuf::from(format!("{}.xlsx", unique_temp_db_path("report_empty")));
    let counts = export_report(&db, &out, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
    assert_eq!(counts, Default::default());
    assert!(out.exists());
    std::fs::remove_file(&out).ok();
}
