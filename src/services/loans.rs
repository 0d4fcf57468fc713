// src/services/loans.rs
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map};

use crate::domain::fields::{children, number_value, RawRecord};
use crate::domain::loan::{Loan, LoanStatus, NewLoan, LOAN_ID_FIELDS};
use crate::errors::MillError;
use crate::services::{decode_children, now_iso};
use crate::store::{child_path, TreeStore};

pub const LOANS: &str = "loans";

/// A loan as the loan screen shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanView {
    pub loan: Loan,
    pub display_status: LoanStatus,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoanSummary {
    pub total: usize,
    pub active: usize,
    pub overdue: usize,
    pub total_amount: f64,
    pub total_outstanding: f64,
}

/// `LN-` followed by the millisecond clock in base 36.
pub fn loan_id(now_millis: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = now_millis.max(0) as u64;
    let mut buf = Vec::new();
    loop {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    buf.reverse();
    format!("LN-{}", String::from_utf8_lossy(&buf))
}

pub fn summarize(views: &[LoanView]) -> LoanSummary {
    LoanSummary {
        total: views.len(),
        active: views
            .iter()
            .filter(|v| v.display_status == LoanStatus::Active)
            .count(),
        overdue: views
            .iter()
            .filter(|v| v.display_status == LoanStatus::Overdue)
            .count(),
        total_amount: views.iter().map(|v| v.loan.amount).sum(),
        total_outstanding: views.iter().map(|v| v.outstanding).sum(),
    }
}

pub struct LoanService<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> LoanService<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    pub fn list(&self, today: NaiveDate) -> Result<Vec<LoanView>, MillError> {
        let Some(node) = self.store.get(LOANS)? else {
            return Ok(Vec::new());
        };
        let mut loans = decode_children(&node, "loan", Loan::from_raw);
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));

        Ok(loans
            .into_iter()
            .map(|loan| LoanView {
                display_status: loan.display_status(today),
                outstanding: loan.outstanding(),
                loan,
            })
            .collect())
    }

    pub fn summary(&self, today: NaiveDate) -> Result<LoanSummary, MillError> {
        Ok(summarize(&self.list(today)?))
    }

    /// Case-insensitive search over customer and id, plus an optional
    /// display-status filter.
    pub fn filter(
        &self,
        query: &str,
        status: Option<LoanStatus>,
        today: NaiveDate,
    ) -> Result<Vec<LoanView>, MillError> {
        let q = query.trim().to_lowercase();
        Ok(self
            .list(today)?
            .into_iter()
            .filter(|v| {
                q.is_empty()
                    || v.loan.customer.to_lowercase().contains(&q)
                    || v.loan.id.to_lowercase().contains(&q)
            })
            .filter(|v| status.map_or(true, |s| v.display_status == s))
            .collect())
    }

    pub fn add_loan(&self, input: NewLoan, today: NaiveDate) -> Result<Loan, MillError> {
        let loan = input.into_loan(loan_id(Utc::now().timestamp_millis()), today)?;
        self.store.set(&child_path(LOANS, &loan.id), &loan.to_record())?;
        log::info!("issued loan {} to {}", loan.id, loan.customer);
        Ok(loan)
    }

    /// Locate a loan by its key or by the id stored inside it.
    fn find(&self, id: &str) -> Result<(String, Loan), MillError> {
        if let Some(raw) = self.store.get(&child_path(LOANS, id))? {
            return Ok((id.to_string(), Loan::from_raw(id, &raw)?));
        }
        // Older records sit under push keys with the loan id inside.
        let node = self.store.get(LOANS)?.unwrap_or_default();
        children(&node)
            .into_iter()
            .find(|(key, raw)| {
                RawRecord::new(key, raw)
                    .ok()
                    .and_then(|rec| rec.text(LOAN_ID_FIELDS))
                    .as_deref()
                    == Some(id)
            })
            .map(|(key, raw)| Loan::from_raw(&key, raw).map(|l| (key, l)))
            .transpose()?
            .ok_or_else(|| MillError::NotFound(format!("loan {id}")))
    }

    pub fn repay(&self, id: &str) -> Result<Loan, MillError> {
        let (key, mut loan) = self.find(id)?;
        loan.status = LoanStatus::FullyRepaid;

        let mut fields = Map::new();
        fields.insert("status".into(), json!(loan.status.as_str()));
        fields.insert("updated_at".into(), json!(now_iso()));
        self.store.update(&child_path(LOANS, &key), &fields)?;
        log::info!("loan {} marked fully repaid", loan.id);
        Ok(loan)
    }

    pub fn record_payment(&self, id: &str, amount: f64) -> Result<Loan, MillError> {
        if !(amount > 0.0) {
            return Err(MillError::BadRequest("payment must be a positive amount".into()));
        }
        let (key, mut loan) = self.find(id)?;
        if loan.status == LoanStatus::FullyRepaid {
            return Err(MillError::BadRequest(format!("loan {} is already repaid", loan.id)));
        }

        loan.paid_amount += amount;
        loan.status = if loan.paid_amount >= loan.amount {
            LoanStatus::FullyRepaid
        } else {
            LoanStatus::PartiallyRepaid
        };

        let mut fields = Map::new();
        fields.insert("paidAmount".into(), number_value(loan.paid_amount));
        fields.insert("status".into(), json!(loan.status.as_str()));
        fields.insert("updated_at".into(), json!(now_iso()));
        self.store.update(&child_path(LOANS, &key), &fields)?;
        log::info!(
            "payment of {amount} on loan {}: {} ({} outstanding)",
            loan.id,
            loan.status,
            loan.outstanding()
        );
        Ok(loan)
    }
}
