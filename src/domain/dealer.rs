// src/domain/dealer.rs
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::fields::{children, number_value, RawRecord};
use crate::errors::MillError;

pub const GUEST_DEALER_NAME: &str = "Guest Dealer";
pub const GUEST_CREDIT_LIMIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dealer {
    /// Document id; `None` for the guest dealer.
    pub doc_id: Option<String>,
    pub uid: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub credit_limit: f64,
    pub credit_used: f64,
    pub credit_remaining: f64,
    pub trust_level: String,
    pub payment_methods: Vec<String>,
    pub saved_address: Option<Value>,
}

impl Dealer {
    /// Stand-in returned when no dealer record matches the signed-in user.
    pub fn guest() -> Self {
        Dealer {
            doc_id: None,
            uid: None,
            name: GUEST_DEALER_NAME.to_string(),
            email: None,
            credit_limit: GUEST_CREDIT_LIMIT,
            credit_used: 0.0,
            credit_remaining: GUEST_CREDIT_LIMIT,
            trust_level: "standard".to_string(),
            payment_methods: vec!["online".to_string()],
            saved_address: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.doc_id.is_none()
    }

    pub fn from_raw(doc_id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(doc_id, raw)?;
        let credit_limit = rec.number(&["creditLimit", "credit_limit"]).unwrap_or(0.0);
        let credit_used = rec.number(&["creditUsed", "credit_used"]).unwrap_or(0.0);

        let payment_methods = rec
            .raw(&["paymentMethods", "payment_methods"])
            .map(|node| {
                children(node)
                    .into_iter()
                    .filter_map(|(_, v)| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Dealer {
            doc_id: Some(doc_id.to_string()),
            uid: rec.text(&["uid", "userId"]),
            name: rec.text(&["name", "businessName", "dealerName"]).unwrap_or_else(|| doc_id.to_string()),
            email: rec.text(&["email"]),
            credit_limit,
            credit_used,
            credit_remaining: rec
                .number(&["creditRemaining", "credit_remaining"])
                .unwrap_or(credit_limit - credit_used),
            trust_level: rec
                .text(&["trustLevel", "trust_level"])
                .unwrap_or_else(|| "standard".to_string()),
            payment_methods,
            saved_address: rec.raw(&["savedAddress", "saved_address"]).cloned(),
        })
    }
}

/// Credit fields written by `update_credit`. `credit_remaining` follows
/// from the other two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditUpdate {
    pub credit_limit: f64,
    pub credit_used: f64,
}

impl CreditUpdate {
    pub fn to_fields(self, now: &str) -> Result<Map<String, Value>, MillError> {
        if self.credit_limit < 0.0 || self.credit_used < 0.0 {
            return Err(MillError::BadRequest("credit amounts must not be negative".into()));
        }
        let mut fields = Map::new();
        fields.insert("creditLimit".into(), number_value(self.credit_limit));
        fields.insert("creditUsed".into(), number_value(self.credit_used));
        fields.insert(
            "creditRemaining".into(),
            number_value(self.credit_limit - self.credit_used),
        );
        fields.insert("updated_at".into(), json!(now));
        Ok(fields)
    }
}
