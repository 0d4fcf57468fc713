// src/domain/fields.rs

//! Typed access to raw backend records.
//!
//! Records were written over time by different screens and scripts, so the
//! same logical field shows up under several names (`current_stock`,
//! `currentStock`) and with several JSON types (`400`, `"400"`). Every decode
//! goes through [`RawRecord`], which tries a fixed alias list in order and
//! takes the first alias holding a usable value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use crate::errors::MillError;

pub struct RawRecord<'a> {
    id: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> RawRecord<'a> {
    pub fn new(id: &'a str, value: &'a Value) -> Result<Self, MillError> {
        match value {
            Value::Object(fields) => Ok(Self { id, fields }),
            other => Err(MillError::invalid(
                id,
                format!("expected an object, found {}", type_name(other)),
            )),
        }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn fields(&self) -> &'a Map<String, Value> {
        self.fields
    }

    /// First non-null value among `aliases`.
    pub fn raw(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .find(|v| !v.is_null())
    }

    /// Non-empty trimmed text. Numbers and booleans are rendered as text.
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .find_map(as_text)
    }

    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .find_map(as_number)
    }

    pub fn boolean(&self, aliases: &[&str]) -> Option<bool> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .find_map(|v| match v {
                Value::Bool(b) => Some(*b),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" => Some(true),
                    "false" | "no" => Some(false),
                    _ => None,
                },
                _ => None,
            })
    }

    pub fn date(&self, aliases: &[&str]) -> Option<NaiveDate> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .filter_map(Value::as_str)
            .find_map(parse_date)
    }

    pub fn require_text(&self, aliases: &[&str], what: &str) -> Result<String, MillError> {
        self.text(aliases)
            .ok_or_else(|| MillError::invalid(self.id, format!("missing {what}")))
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers, or strings holding a plain number (thousands separators allowed).
pub fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Accepts `YYYY-MM-DD`, ISO timestamps (date part), RFC 3339 and `DD/MM/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Some((date, _)) = s.split_once('T') {
        if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return Some(d);
        }
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

/// A point in time from RFC 3339 (any offset), a naive ISO or
/// `YYYY-MM-DD HH:MM:SS` timestamp (taken as UTC), a bare date (midnight) or
/// epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(millis) = s.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    parse_date(s)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// JSON number for `n`, written as an integer when it has no fraction.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Iterate the children of a tree node as `(key, value)` pairs.
///
/// The tree store turns arrays with sequential keys back into JSON arrays, so
/// a node may come back either way; array children get their index as key and
/// null holes are skipped.
pub fn children(node: &Value) -> Vec<(String, &Value)> {
    match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}
