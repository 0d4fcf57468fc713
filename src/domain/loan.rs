// src/domain/loan.rs
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::fields::{number_value, RawRecord};
use crate::errors::MillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoanStatus {
    Active,
    #[serde(rename = "Partially Repaid")]
    PartiallyRepaid,
    #[serde(rename = "Fully Repaid")]
    FullyRepaid,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::PartiallyRepaid => "Partially Repaid",
            LoanStatus::FullyRepaid => "Fully Repaid",
            LoanStatus::Overdue => "Overdue",
        }
    }

    /// Accepts the spellings found in stored records.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();

        match key.as_str() {
            "active" | "issued" | "open" => Some(LoanStatus::Active),
            "partially repaid" | "partial" | "partially paid" => Some(LoanStatus::PartiallyRepaid),
            "fully repaid" | "repaid" | "settled" | "fully settled" | "early settlement"
            | "closed" => Some(LoanStatus::FullyRepaid),
            "overdue" => Some(LoanStatus::Overdue),
            _ => None,
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loan {
    pub id: String,
    pub customer: String,
    pub rice_type: Option<String>,
    pub quantity: Option<f64>,
    pub amount: f64,
    pub paid_amount: f64,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// As stored. `Overdue` is only derived for display, never written.
    pub status: LoanStatus,
    pub seed: bool,
}

/// Fields a loan record may keep its business id under.
pub const LOAN_ID_FIELDS: &[&str] = &["id", "loanId"];

impl Loan {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;

        let status = match rec.text(&["status", "loanStatus"]) {
            Some(s) => LoanStatus::parse(&s)
                .ok_or_else(|| MillError::invalid(id, format!("unknown loan status '{s}'")))?,
            None => LoanStatus::Active,
        };

        Ok(Loan {
            id: rec.text(LOAN_ID_FIELDS).unwrap_or_else(|| id.to_string()),
            customer: rec.require_text(&["customer", "customerName", "dealerName", "borrower"], "customer")?,
            rice_type: rec.text(&["riceType", "rice_type", "product"]),
            quantity: rec.number(&["quantity", "quantity_kg"]),
            amount: rec
                .number(&["amount", "principal", "loanAmount", "loan_amount"])
                .unwrap_or(0.0),
            paid_amount: rec
                .number(&["paidAmount", "paid_amount", "amountPaid", "repaid"])
                .unwrap_or(0.0),
            issue_date: rec.date(&["issueDate", "issue_date", "loanDate"]),
            due_date: rec.date(&["dueDate", "due_date"]),
            status,
            seed: rec.boolean(&["seed"]).unwrap_or(false),
        })
    }

    /// Status shown to the user on `today`: a loan that is not fully repaid
    /// becomes Overdue once its due day has ended.
    pub fn display_status(&self, today: NaiveDate) -> LoanStatus {
        if self.status == LoanStatus::FullyRepaid {
            return LoanStatus::FullyRepaid;
        }
        match self.due_date {
            Some(due) if due < today => LoanStatus::Overdue,
            _ => self.status,
        }
    }

    pub fn outstanding(&self) -> f64 {
        (self.amount - self.paid_amount).max(0.0)
    }

    pub fn to_record(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("customer".into(), json!(self.customer));
        map.insert("amount".into(), number_value(self.amount));
        map.insert("paidAmount".into(), number_value(self.paid_amount));
        map.insert("status".into(), json!(self.status.as_str()));
        if let Some(t) = &self.rice_type {
            map.insert("riceType".into(), json!(t));
        }
        if let Some(q) = self.quantity {
            map.insert("quantity".into(), number_value(q));
        }
        if let Some(d) = self.issue_date {
            map.insert("issueDate".into(), json!(d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.due_date {
            map.insert("dueDate".into(), json!(d.format("%Y-%m-%d").to_string()));
        }
        if self.seed {
            map.insert("seed".into(), json!(true));
        }
        Value::Object(map)
    }
}

/// Loan form input.
#[derive(Debug, Clone, Default)]
pub struct NewLoan {
    pub customer: String,
    pub rice_type: String,
    pub quantity: f64,
    pub amount: f64,
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl NewLoan {
    pub fn into_loan(self, id: String, today: NaiveDate) -> Result<Loan, MillError> {
        if self.customer.trim().is_empty()
            || self.rice_type.trim().is_empty()
            || self.quantity <= 0.0
            || self.amount <= 0.0
        {
            return Err(MillError::BadRequest(
                "customer, rice type, quantity and amount are required".into(),
            ));
        }
        let Some(due) = self.due_date else {
            return Err(MillError::BadRequest("a due date is required".into()));
        };
        let issue = self.issue_date.unwrap_or(today);
        if due < issue {
            return Err(MillError::BadRequest(
                "due date cannot be earlier than issue date".into(),
            ));
        }

        Ok(Loan {
            id,
            customer: self.customer.trim().to_string(),
            rice_type: Some(self.rice_type.trim().to_string()),
            quantity: Some(self.quantity),
            amount: self.amount,
            paid_amount: 0.0,
            issue_date: Some(issue),
            due_date: Some(due),
            status: LoanStatus::Active,
            seed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn past_due_active_loan_displays_overdue() {
        let raw = json!({
            "customer": "Dealer Ravi", "amount": "125000",
            "issueDate": "2024-01-05", "dueDate": "2024-02-05", "status": "Active"
        });
        let loan = Loan::from_raw("LN-1", &raw).unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.display_status(day(2024, 3, 1)), LoanStatus::Overdue);
        // The due day itself is still on time.
        assert_eq!(loan.display_status(day(2024, 2, 5)), LoanStatus::Active);
    }

    #[test]
    fn repaid_loans_never_turn_overdue() {
        let raw = json!({"customer": "A", "amount": 10, "dueDate": "2020-01-01", "status": "Fully Repaid"});
        let loan = Loan::from_raw("L", &raw).unwrap();
        assert_eq!(loan.display_status(day(2024, 1, 1)), LoanStatus::FullyRepaid);
    }

    #[test]
    fn legacy_status_spellings_parse() {
        assert_eq!(LoanStatus::parse("partially_repaid"), Some(LoanStatus::PartiallyRepaid));
        assert_eq!(LoanStatus::parse("Early Settlement"), Some(LoanStatus::FullyRepaid));
        assert_eq!(LoanStatus::parse(" ACTIVE "), Some(LoanStatus::Active));
        assert_eq!(LoanStatus::parse("Pending Approval"), None);
    }

    #[test]
    fn unknown_status_makes_the_record_invalid() {
        let raw = json!({"customer": "A", "amount": 10, "status": "Edit Request"});
        assert!(Loan::from_raw("L", &raw).is_err());
    }

    #[test]
    fn new_loan_rejects_due_before_issue() {
        let input = NewLoan {
            customer: "Sunil".into(),
            rice_type: "Nadu".into(),
            quantity: 500.0,
            amount: 90000.0,
            issue_date: Some(day(2024, 5, 10)),
            due_date: Some(day(2024, 5, 1)),
        };
        assert!(input.into_loan("LN-x".into(), day(2024, 5, 10)).is_err());
    }

    #[test]
    fn new_loan_defaults_issue_date_to_today() {
        let loan = NewLoan {
            customer: "Sunil".into(),
            rice_type: "Nadu".into(),
            quantity: 500.0,
            amount: 90000.0,
            issue_date: None,
            due_date: Some(day(2024, 8, 1)),
        }
        .into_loan("LN-x".into(), day(2024, 5, 10))
        .unwrap();

        assert_eq!(loan.issue_date, Some(day(2024, 5, 10)));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(Loan::from_raw("LN-x", &loan.to_record()).unwrap(), loan);
    }
}
