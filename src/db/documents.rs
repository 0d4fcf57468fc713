// src/db/documents.rs
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::db::connection::Database;
use crate::errors::MillError;
use crate::store::{Document, DocumentStore};

impl DocumentStore for Database {
    fn list(&self, collection: &str) -> Result<Vec<Document>, MillError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut out = Vec::new();
            for r in rows {
                let (id, data) = r?;
                out.push(to_document(id, &data)?);
            }
            Ok(out)
        })
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, MillError> {
        self.with_conn(|conn| load(conn, collection, id))
    }

    fn set(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<(), MillError> {
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(data)?;

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO documents (collection, id, data, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                ON CONFLICT(collection, id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at
                "#,
                params![collection, id, json, now],
            )?;
            Ok(())
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), MillError> {
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let Some(mut doc) = load(&tx, collection, id)? else {
                return Err(MillError::NotFound(format!("{collection}/{id}")));
            };
            for (k, v) in fields {
                doc.data.insert(k.clone(), v.clone());
            }

            tx.execute(
                "UPDATE documents SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
                params![serde_json::to_string(&doc.data)?, now, collection, id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, MillError> {
        let needle = sql_value(value)?;
        let json_path = format!("$.\"{}\"", field.replace('"', ""));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, data FROM documents
                WHERE collection = ?1 AND json_extract(data, ?2) = ?3
                ORDER BY id
                "#,
            )?;
            let rows = stmt.query_map(params![collection, json_path, needle], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut out = Vec::new();
            for r in rows {
                let (id, data) = r?;
                out.push(to_document(id, &data)?);
            }
            Ok(out)
        })
    }
}

fn load(conn: &Connection, collection: &str, id: &str) -> Result<Option<Document>, MillError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    data.map(|d| to_document(id.to_string(), &d)).transpose()
}

fn to_document(id: String, data: &str) -> Result<Document, MillError> {
    match serde_json::from_str(data)? {
        Value::Object(data) => Ok(Document { id, data }),
        _ => Err(MillError::invalid(&id, "stored document is not an object")),
    }
}

/// What `json_extract` yields for a scalar JSON value.
fn sql_value(value: &Value) -> Result<SqlValue, MillError> {
    match value {
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => Ok(SqlValue::Real(n.as_f64().unwrap_or_default())),
        },
        _ => Err(MillError::BadRequest(
            "equality filters only support scalar values".into(),
        )),
    }
}
