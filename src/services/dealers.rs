// src/services/dealers.rs
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::domain::dealer::{CreditUpdate, Dealer};
use crate::domain::fields::number_value;
use crate::errors::MillError;
use crate::services::{decode_docs, now_iso};
use crate::store::DocumentStore;

pub const DEALERS: &str = "dealers";
pub const BANK_STATEMENTS: &str = "bank_statements";

/// Statement uploaded by a dealer asking for a higher credit limit.
#[derive(Debug, Clone, Default)]
pub struct BankStatementRequest {
    pub dealer_id: String,
    pub bank_name: String,
    pub account_number: String,
    /// Link to the uploaded statement file.
    pub statement_url: Option<String>,
    pub requested_limit: Option<f64>,
}

impl BankStatementRequest {
    fn to_fields(&self, id: &str, now: &str) -> Result<Map<String, Value>, MillError> {
        if self.dealer_id.trim().is_empty() || self.bank_name.trim().is_empty() {
            return Err(MillError::BadRequest(
                "dealer and bank name are required".into(),
            ));
        }
        let mut fields = Map::new();
        fields.insert("id".into(), json!(id));
        fields.insert("dealerId".into(), json!(self.dealer_id));
        fields.insert("bankName".into(), json!(self.bank_name.trim()));
        fields.insert("accountNumber".into(), json!(self.account_number.trim()));
        if let Some(url) = &self.statement_url {
            fields.insert("statementUrl".into(), json!(url));
        }
        if let Some(limit) = self.requested_limit {
            fields.insert("requestedLimit".into(), number_value(limit));
        }
        fields.insert("status".into(), json!("pending"));
        fields.insert("submitted_at".into(), json!(now));
        fields.insert("created_at".into(), json!(now));
        Ok(fields)
    }
}

pub struct DealerService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> DealerService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// The dealer record of a signed-in user, or the guest dealer when there
    /// is none. Backend failures are returned, not papered over.
    pub fn by_uid(&self, uid: &str) -> Result<Dealer, MillError> {
        match self.store.find_eq(DEALERS, "uid", &json!(uid))?.into_iter().next() {
            Some(doc) => Dealer::from_raw(&doc.id, &doc.to_value()),
            None => {
                log::debug!("no dealer for uid {uid}, using the guest dealer");
                Ok(Dealer::guest())
            }
        }
    }

    pub fn all(&self) -> Result<Vec<Dealer>, MillError> {
        Ok(decode_docs(self.store.list(DEALERS)?, "dealer", Dealer::from_raw))
    }

    pub fn submit_bank_statement(&self, req: &BankStatementRequest) -> Result<String, MillError> {
        let millis = Utc::now().timestamp_millis().to_string();
        let id = format!("STMT-{}", &millis[millis.len().saturating_sub(8)..]);
        let fields = req.to_fields(&id, &now_iso())?;
        self.store.set(BANK_STATEMENTS, &id, &fields)?;
        log::info!("bank statement {id} submitted for dealer {}", req.dealer_id);
        Ok(id)
    }

    pub fn update_credit(&self, uid: &str, credit: CreditUpdate) -> Result<Dealer, MillError> {
        let dealer = self.by_uid(uid)?;
        let Some(doc_id) = dealer.doc_id.clone() else {
            return Err(MillError::NotFound(format!("dealer {uid}")));
        };

        let fields = credit.to_fields(&now_iso())?;
        self.store.update(DEALERS, &doc_id, &fields)?;

        Ok(Dealer {
            credit_limit: credit.credit_limit,
            credit_used: credit.credit_used,
            credit_remaining: credit.credit_limit - credit.credit_used,
            ..dealer
        })
    }
}
