// src/services/mod.rs
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::domain::fields::children;
use crate::errors::MillError;
use crate::store::Document;

pub mod dealers;
pub mod insights;
pub mod inventory;
pub mod loans;
pub mod products;
pub mod transport;
pub mod workers;

/// Decode every child of a tree node. Children that do not decode are
/// logged and skipped, so one bad record cannot hide the rest.
pub(crate) fn decode_children<T>(
    node: &Value,
    what: &str,
    decode: impl Fn(&str, &Value) -> Result<T, MillError>,
) -> Vec<T> {
    children(node)
        .into_iter()
        .filter_map(|(key, raw)| match decode(&key, raw) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("skipping {what} {key}: {e}");
                None
            }
        })
        .collect()
}

/// Same as [`decode_children`], for documents.
pub(crate) fn decode_docs<T>(
    docs: Vec<Document>,
    what: &str,
    decode: impl Fn(&str, &Value) -> Result<T, MillError>,
) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match decode(&doc.id, &doc.to_value()) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("skipping {what} {}: {e}", doc.id);
                None
            }
        })
        .collect()
}

/// Timestamp format used for `created_at` / `updated_at` fields.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
