// src/domain/worker.rs
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::fields::{as_number, number_value, RawRecord};
use crate::errors::MillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkerStatus {
    Present,
    Absent,
    #[serde(rename = "On Leave")]
    OnLeave,
    Active,
    Pending,
    Inactive,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Present => "Present",
            WorkerStatus::Absent => "Absent",
            WorkerStatus::OnLeave => "On Leave",
            WorkerStatus::Active => "active",
            WorkerStatus::Pending => "pending",
            WorkerStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "present" => Some(WorkerStatus::Present),
            "absent" => Some(WorkerStatus::Absent),
            "on leave" | "leave" => Some(WorkerStatus::OnLeave),
            "active" => Some(WorkerStatus::Active),
            "pending" => Some(WorkerStatus::Pending),
            "inactive" | "terminated" => Some(WorkerStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monthly salary as it was stored.
///
/// Screens write a number; some older import scripts wrote a display string
/// such as `"Rs. 32,000"`. The stored form is kept because the cleanup
/// classifier looks at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Salary {
    Amount(f64),
    Formatted(String),
    Missing,
}

impl Salary {
    fn from_value(v: Option<&Value>) -> Self {
        match v {
            Some(Value::Number(n)) => n.as_f64().map(Salary::Amount).unwrap_or(Salary::Missing),
            Some(Value::String(s)) if !s.trim().is_empty() => Salary::Formatted(s.clone()),
            _ => Salary::Missing,
        }
    }

    /// Best-effort amount, digits pulled out of a formatted string.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Salary::Amount(n) => Some(*n),
            Salary::Formatted(s) => {
                let digits: String = s
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                as_number(&Value::String(digits.trim_end_matches('.').to_string()))
            }
            Salary::Missing => None,
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Salary::Amount(n) => Some(number_value(*n)),
            Salary::Formatted(s) => Some(json!(s)),
            Salary::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Worker {
    /// Key under `workers/`.
    pub key: String,
    /// Business id (e.g. `W1001`); falls back to the key.
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub status: Option<WorkerStatus>,
    pub salary: Salary,
    pub daily_wage: Option<f64>,
    pub photo: Option<String>,
    pub bank_account: Option<String>,
    pub present_days: u32,
    pub absent_days: u32,
    pub last_attendance: Option<String>,
    pub seed: bool,
}

impl Worker {
    /// Decode a `workers/<key>` record. Only the shape is checked here; a
    /// nameless worker still decodes so that cleanup can see it.
    pub fn from_raw(key: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(key, raw)?;

        let status = match rec.text(&["status"]) {
            Some(s) => Some(
                WorkerStatus::parse(&s)
                    .ok_or_else(|| MillError::invalid(key, format!("unknown worker status '{s}'")))?,
            ),
            None => None,
        };

        let attendance = rec.raw(&["attendance"]);
        let counter = |nested: &str, flat: &[&str]| -> u32 {
            attendance
                .and_then(|a| a.get(nested))
                .and_then(as_number)
                .or_else(|| rec.number(flat))
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(0)
        };

        Ok(Worker {
            key: key.to_string(),
            id: rec.text(&["id", "workerId"]).unwrap_or_else(|| key.to_string()),
            name: rec.text(&["name", "fullName"]),
            email: rec.text(&["email"]),
            phone: rec.text(&["phone", "contact"]),
            role: rec.text(&["role", "position"]),
            status,
            salary: Salary::from_value(rec.raw(&["salary", "monthlySalary"])),
            daily_wage: rec.number(&["dailyWage", "daily_wage"]),
            photo: rec.text(&["photo", "photoURL", "avatar"]),
            bank_account: rec.text(&["bankAccount", "bank_account"]),
            present_days: counter("present", &["presentDays", "present_days"]),
            absent_days: counter("absent", &["absentDays", "absent_days"]),
            last_attendance: rec.text(&["lastAttendance", "last_attendance"]),
            seed: rec.boolean(&["seed"]).unwrap_or(false),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }

    pub fn to_record(&self) -> Value {
        let mut rec = Map::new();
        rec.insert("id".into(), json!(self.id));
        let optional = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("role", &self.role),
            ("photo", &self.photo),
            ("bankAccount", &self.bank_account),
            ("lastAttendance", &self.last_attendance),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                rec.insert(field.into(), json!(v));
            }
        }
        if let Some(status) = self.status {
            rec.insert("status".into(), json!(status.as_str()));
        }
        if let Some(salary) = self.salary.to_value() {
            rec.insert("salary".into(), salary);
        }
        if let Some(wage) = self.daily_wage {
            rec.insert("dailyWage".into(), number_value(wage));
        }
        rec.insert(
            "attendance".into(),
            json!({ "present": self.present_days, "absent": self.absent_days }),
        );
        if self.seed {
            rec.insert("seed".into(), json!(true));
        }
        Value::Object(rec)
    }
}
