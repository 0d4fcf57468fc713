// src/cleanup.rs

//! Finds worker records left behind by seeding and test imports, and
//! optionally deletes them together with their salary record for a month.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::domain::fields::{children, RawRecord};
use crate::errors::MillError;
use crate::services::workers::{SALARIES, WORKERS};
use crate::store::{child_path, TreeStore};

/// Why a worker record was flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    SeedMarker,
    FormattedSalary(String),
    PlaceholderPhoto,
    PendingWithoutDetails,
    SeededId,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::SeedMarker => f.write_str("seed marker"),
            Reason::FormattedSalary(s) => write!(f, "salary stored as text ({s})"),
            Reason::PlaceholderPhoto => f.write_str("generated avatar photo"),
            Reason::PendingWithoutDetails => f.write_str("pending without bank account or name"),
            Reason::SeededId => f.write_str("seeded id pattern"),
        }
    }
}

/// Flags worker records by their stored fields.
///
/// The checks read the raw JSON rather than a decoded [`Worker`], so a record
/// with a status the screens no longer use is still classified. Field names
/// and comparisons are exact: `status` must be the string `"pending"` and the
/// seeded-id pattern only applies to a string `id` field.
///
/// [`Worker`]: crate::domain::worker::Worker
pub struct Classifier {
    salary_text: Regex,
    seeded_id: Regex,
    marker_only: bool,
}

impl Classifier {
    /// `marker_only` turns the legacy heuristics off and trusts only the
    /// `seed` marker.
    pub fn new(marker_only: bool) -> Result<Self, MillError> {
        let compile =
            |re: &str| Regex::new(re).map_err(|e| MillError::Config(format!("bad pattern {re}: {e}")));
        Ok(Self {
            salary_text: compile(r"(?i)rs\.?\s*\d+")?,
            seeded_id: compile(r"^W\d{6,}$")?,
            marker_only,
        })
    }

    /// Every reason that applies; empty means keep the record.
    pub fn reasons(&self, rec: &RawRecord<'_>) -> Vec<Reason> {
        let fields = rec.fields();
        let string = |name: &str| fields.get(name).and_then(Value::as_str);
        let present = |name: &str| string(name).map_or(false, |s| !s.is_empty());

        let mut out = Vec::new();
        if rec.boolean(&["seed"]).unwrap_or(false) {
            out.push(Reason::SeedMarker);
        }
        if self.marker_only {
            return out;
        }

        if let Some(text) = string("salary") {
            if self.salary_text.is_match(text) {
                out.push(Reason::FormattedSalary(text.to_string()));
            }
        }
        if string("photo").map_or(false, |p| p.contains("dicebear")) {
            out.push(Reason::PlaceholderPhoto);
        }
        if string("status") == Some("pending") && !(present("bankAccount") && present("name")) {
            out.push(Reason::PendingWithoutDetails);
        }
        if string("id").map_or(false, |id| self.seeded_id.is_match(id)) {
            out.push(Reason::SeededId);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Key under `workers/`.
    pub key: String,
    /// Worker id used for the salary record; falls back to the key.
    pub id: String,
    pub name: Option<String>,
    pub reasons: Vec<Reason>,
}

impl Candidate {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    /// Without this the run only reports.
    pub delete: bool,
    /// `YYYY-MM`; also delete `salaries/<month>/<worker id>`.
    pub month: Option<String>,
    pub marker_only: bool,
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub scanned: usize,
    pub candidates: Vec<Candidate>,
    /// Keys whose value is not a record; never deleted.
    pub undecodable: Vec<String>,
    pub deleted: Vec<String>,
    pub salaries_deleted: Vec<String>,
    pub failures: Vec<(String, String)>,
}

pub fn validate_month(month: &str) -> Result<(), MillError> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| MillError::BadRequest(format!("month must look like YYYY-MM, got '{month}'")))
}

/// Scan `workers` and classify each record. Never writes.
pub fn plan(store: &dyn TreeStore, classifier: &Classifier) -> Result<CleanupReport, MillError> {
    let mut report = CleanupReport::default();
    let Some(node) = store.get(WORKERS)? else {
        return Ok(report);
    };

    for (key, raw) in children(&node) {
        report.scanned += 1;
        match RawRecord::new(&key, raw) {
            Ok(rec) => {
                let reasons = classifier.reasons(&rec);
                if !reasons.is_empty() {
                    report.candidates.push(Candidate {
                        id: rec.text(&["id", "workerId"]).unwrap_or_else(|| key.clone()),
                        name: rec.text(&["name", "fullName"]),
                        key: key.clone(),
                        reasons,
                    });
                }
            }
            Err(e) => {
                log::warn!("cannot classify worker {key}: {e}");
                report.undecodable.push(key.clone());
            }
        }
    }
    Ok(report)
}

pub fn run(store: &dyn TreeStore, opts: &CleanupOptions) -> Result<CleanupReport, MillError> {
    if let Some(month) = &opts.month {
        validate_month(month)?;
    }
    let classifier = Classifier::new(opts.marker_only)?;
    let mut report = plan(store, &classifier)?;
    log::info!(
        "scanned {} workers, {} flagged",
        report.scanned,
        report.candidates.len()
    );

    if !opts.delete {
        return Ok(report);
    }

    for candidate in &report.candidates {
        let key = &candidate.key;
        if let Err(e) = store.remove(&child_path(WORKERS, key)) {
            log::error!("failed to delete workers/{key}: {e}");
            report.failures.push((format!("workers/{key}"), e.to_string()));
            continue;
        }
        log::info!("deleted workers/{key}");
        report.deleted.push(key.clone());

        if let Some(month) = &opts.month {
            let path = child_path(&child_path(SALARIES, month), &candidate.id);
            match store.remove(&path) {
                Ok(()) => {
                    log::info!("deleted {path}");
                    report.salaries_deleted.push(path);
                }
                Err(e) => {
                    log::error!("failed to delete {path}: {e}");
                    report.failures.push((path, e.to_string()));
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasons(c: &Classifier, raw: Value) -> Vec<Reason> {
        c.reasons(&RawRecord::new("k", &raw).unwrap())
    }

    #[test]
    fn formatted_salary_is_flagged_numeric_is_not() {
        let c = Classifier::new(false).unwrap();
        assert_eq!(
            reasons(&c, json!({"id": "W01", "name": "A", "salary": "Rs. 32,000", "bankAccount": "1"})),
            vec![Reason::FormattedSalary("Rs. 32,000".into())]
        );
        assert!(reasons(&c, json!({"id": "W01", "name": "A", "salary": 32000, "bankAccount": "1"})).is_empty());
    }

    #[test]
    fn salary_text_without_currency_is_not_flagged() {
        let c = Classifier::new(false).unwrap();
        assert!(reasons(&c, json!({"id": "W01", "name": "A", "salary": "32000"})).is_empty());
    }

    #[test]
    fn each_heuristic() {
        let c = Classifier::new(false).unwrap();
        assert_eq!(
            reasons(&c, json!({"name": "A", "photo": "https://api.dicebear.com/7.x/avataaars/svg?seed=A"})),
            vec![Reason::PlaceholderPhoto]
        );
        assert_eq!(
            reasons(&c, json!({"name": "A", "status": "pending"})),
            vec![Reason::PendingWithoutDetails]
        );
        assert_eq!(
            reasons(&c, json!({"status": "pending", "bankAccount": "BOC-1"})),
            vec![Reason::PendingWithoutDetails]
        );
        assert!(reasons(&c, json!({"name": "A", "status": "pending", "bankAccount": "BOC-1"})).is_empty());
        assert_eq!(
            reasons(&c, json!({"id": "W1700000", "name": "A"})),
            vec![Reason::SeededId]
        );
        assert!(reasons(&c, json!({"id": "W00123", "name": "A"})).is_empty());
    }

    #[test]
    fn status_and_id_comparisons_are_exact() {
        let c = Classifier::new(false).unwrap();
        assert!(reasons(&c, json!({"name": "A", "status": "Pending"})).is_empty());
        assert!(reasons(&c, json!({"name": "A", "status": "PENDING"})).is_empty());
        assert!(reasons(&c, json!({"name": "A", "id": 1700000})).is_empty());
        assert!(reasons(&c, json!({"name": "A", "workerId": "W1700000"})).is_empty());
    }

    #[test]
    fn unknown_status_does_not_hide_other_signs() {
        let c = Classifier::new(false).unwrap();
        assert_eq!(
            reasons(&c, json!({"name": "A", "status": "On Duty", "salary": "Rs. 32,000"})),
            vec![Reason::FormattedSalary("Rs. 32,000".into())]
        );
    }

    #[test]
    fn marker_only_ignores_heuristics() {
        let c = Classifier::new(true).unwrap();
        assert!(reasons(&c, json!({"id": "W1700000", "salary": "Rs 5000"})).is_empty());
        assert_eq!(
            reasons(&c, json!({"name": "A", "seed": true})),
            vec![Reason::SeedMarker]
        );
    }

    #[test]
    fn months_are_checked() {
        assert!(validate_month("2024-09").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("Sept").is_err());
    }
}
