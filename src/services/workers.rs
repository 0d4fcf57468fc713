// src/services/workers.rs
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map};

use crate::domain::worker::{Worker, WorkerStatus};
use crate::errors::MillError;
use crate::services::{decode_children, now_iso};
use crate::store::{child_path, TreeStore};

pub const WORKERS: &str = "workers";
pub const SALARIES: &str = "salaries";

/// Days a present worker is paid for in the monthly payroll estimate.
const PAYROLL_DAYS: f64 = 30.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub headcount: usize,
    pub present: usize,
    pub absent: usize,
    pub on_leave: usize,
    pub present_days: u64,
    pub absent_days: u64,
    /// Daily wage times 30 over workers currently marked present.
    pub monthly_payroll: f64,
}

pub fn summarize_attendance(workers: &[Worker]) -> AttendanceSummary {
    let count = |s: WorkerStatus| workers.iter().filter(|w| w.status == Some(s)).count();

    AttendanceSummary {
        headcount: workers.len(),
        present: count(WorkerStatus::Present),
        absent: count(WorkerStatus::Absent),
        on_leave: count(WorkerStatus::OnLeave),
        present_days: workers.iter().map(|w| u64::from(w.present_days)).sum(),
        absent_days: workers.iter().map(|w| u64::from(w.absent_days)).sum(),
        monthly_payroll: workers
            .iter()
            .filter(|w| w.status == Some(WorkerStatus::Present))
            .map(|w| w.daily_wage.unwrap_or(0.0) * PAYROLL_DAYS)
            .sum(),
    }
}

pub struct WorkerService<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> WorkerService<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Worker>, MillError> {
        let Some(node) = self.store.get(WORKERS)? else {
            return Ok(Vec::new());
        };
        let mut workers = decode_children(&node, "worker", Worker::from_raw);
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(workers)
    }

    pub fn attendance_summary(&self) -> Result<AttendanceSummary, MillError> {
        Ok(summarize_attendance(&self.list()?))
    }

    /// Record one day of attendance for the worker stored under `key`.
    pub fn mark_attendance(
        &self,
        key: &str,
        present: bool,
        day: NaiveDate,
    ) -> Result<Worker, MillError> {
        let path = child_path(WORKERS, key);
        let raw = self
            .store
            .get(&path)?
            .ok_or_else(|| MillError::NotFound(format!("worker {key}")))?;
        let mut worker = Worker::from_raw(key, &raw)?;

        let day = day.format("%Y-%m-%d").to_string();
        if worker.last_attendance.as_deref() == Some(day.as_str()) {
            return Err(MillError::BadRequest(format!(
                "attendance for {} is already marked on {day}",
                worker.display_name()
            )));
        }

        if present {
            worker.present_days += 1;
            worker.status = Some(WorkerStatus::Present);
        } else {
            worker.absent_days += 1;
            worker.status = Some(WorkerStatus::Absent);
        }
        worker.last_attendance = Some(day);

        let mut fields = Map::new();
        fields.insert("attendance/present".into(), json!(worker.present_days));
        fields.insert("attendance/absent".into(), json!(worker.absent_days));
        if let Some(status) = worker.status {
            fields.insert("status".into(), json!(status.as_str()));
        }
        fields.insert("lastAttendance".into(), json!(worker.last_attendance));
        fields.insert("updated_at".into(), json!(now_iso()));
        self.store.update(&path, &fields)?;

        log::info!(
            "{} marked {} ({} present / {} absent)",
            worker.display_name(),
            if present { "present" } else { "absent" },
            worker.present_days,
            worker.absent_days
        );
        Ok(worker)
    }
}
