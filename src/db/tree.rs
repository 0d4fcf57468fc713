// src/db/tree.rs
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::db::connection::Database;
use crate::db::push_id::generate_push_id;
use crate::errors::MillError;
use crate::store::{child_path, path_segments, TreeStore};

/// One pending write: absolute segments and the new value (`Null` removes).
type Write = (Vec<String>, Value);

impl TreeStore for Database {
    fn get(&self, path: &str) -> Result<Option<Value>, MillError> {
        let segs = path_segments(path)?;

        self.with_conn(|conn| match segs.split_first() {
            None => load_all(conn),
            Some((root, rest)) => {
                let node = load_root(conn, root)?;
                Ok(node.and_then(|v| get_at(&v, rest).cloned()))
            }
        })
    }

    fn set(&self, path: &str, value: &Value) -> Result<(), MillError> {
        let segs = owned(path_segments(path)?);
        self.apply(vec![(segs, value.clone())])
    }

    fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), MillError> {
        let base = path_segments(path)?;
        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let mut segs = owned(base.clone());
            segs.extend(owned(path_segments(key)?));
            writes.push((segs, value.clone()));
        }
        self.apply(writes)
    }

    fn push(&self, path: &str, value: &Value) -> Result<String, MillError> {
        let key = generate_push_id(Utc::now().timestamp_millis());
        self.set(&child_path(path, &key), value)?;
        Ok(key)
    }
}

impl Database {
    /// Apply a batch of writes in one transaction.
    fn apply(&self, writes: Vec<Write>) -> Result<(), MillError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for (segs, value) in writes {
                write_one(&tx, &segs, value)?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn write_one(conn: &Connection, segs: &[String], value: Value) -> Result<(), MillError> {
    let now = Utc::now().to_rfc3339();

    let Some((root, rest)) = segs.split_first() else {
        // Whole-tree replace.
        let value = prune(value);
        conn.execute("DELETE FROM tree_nodes", [])?;
        match value {
            Value::Null => {}
            Value::Object(map) => {
                for (root, node) in map {
                    store_root(conn, &root, &node, &now)?;
                }
            }
            _ => {
                return Err(MillError::BadRequest(
                    "the tree root can only hold an object".into(),
                ))
            }
        }
        return Ok(());
    };

    let mut node = load_root(conn, root)?.unwrap_or(Value::Null);
    set_at(&mut node, rest, value);

    if is_empty_node(&node) {
        conn.execute("DELETE FROM tree_nodes WHERE root = ?1", params![root])?;
    } else {
        store_root(conn, root, &node, &now)?;
    }
    Ok(())
}

fn load_all(conn: &Connection) -> Result<Option<Value>, MillError> {
    let mut stmt = conn.prepare("SELECT root, value FROM tree_nodes ORDER BY root")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Map::new();
    for r in rows {
        let (root, json) = r?;
        out.insert(root, serde_json::from_str(&json)?);
    }

    if out.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(out)))
    }
}

fn load_root(conn: &Connection, root: &str) -> Result<Option<Value>, MillError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT value FROM tree_nodes WHERE root = ?1",
            params![root],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn store_root(conn: &Connection, root: &str, node: &Value, now: &str) -> Result<(), MillError> {
    conn.execute(
        r#"
        INSERT INTO tree_nodes (root, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(root) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
        params![root, serde_json::to_string(node)?, now],
    )?;
    Ok(())
}

fn get_at<'a, S: AsRef<str>>(node: &'a Value, segs: &[S]) -> Option<&'a Value> {
    segs.iter()
        .try_fold(node, |cur, seg| cur.as_object()?.get(seg.as_ref()))
}

fn set_at(node: &mut Value, segs: &[String], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *node = prune(value);
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            // Removing below a leaf or a missing node is a no-op.
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
        if is_empty_node(child) {
            map.remove(head);
        }
    }
}

/// Drop nulls and empty objects, which the tree store never holds.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_empty_node(v))
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(kept)
            }
        }
        other => other,
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn owned(segs: Vec<&str>) -> Vec<String> {
    segs.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::make_test_db;
    use serde_json::json;

    #[test]
    fn set_then_get_nested_paths() {
        let db = make_test_db("tree_nested");
        db.set("products/p1", &json!({"name": "Nadu", "current_stock": 400}))
            .unwrap();
        db.set("products/p1/warehouse", &json!("Warehouse B")).unwrap();

        assert_eq!(
            db.get("products/p1/current_stock").unwrap(),
            Some(json!(400))
        );
        assert_eq!(
            db.get("products/p1").unwrap().unwrap()["warehouse"],
            "Warehouse B"
        );
        assert_eq!(db.get("products/p2").unwrap(), None);
        assert_eq!(db.get("products/p1/name/deeper").unwrap(), None);
    }

    #[test]
    fn writing_null_removes_and_prunes_empty_parents() {
        let db = make_test_db("tree_prune");
        db.set("salaries/2024-05/W1", &json!({"amount": 32000}))
            .unwrap();
        db.remove("salaries/2024-05/W1").unwrap();

        assert_eq!(db.get("salaries/2024-05").unwrap(), None);
        assert_eq!(db.get("salaries").unwrap(), None);
        assert_eq!(db.get("").unwrap(), None);
    }

    #[test]
    fn nulls_inside_written_objects_are_dropped() {
        let db = make_test_db("tree_nulls");
        db.set("workers/w1", &json!({"name": "Kamal", "photo": null, "bank": {}}))
            .unwrap();
        assert_eq!(db.get("workers/w1").unwrap(), Some(json!({"name": "Kamal"})));
    }

    #[test]
    fn update_merges_multi_path_keys() {
        let db = make_test_db("tree_update");
        db.set("trips/t1", &json!({"status": "in-transit", "vehicleId": "V1"}))
            .unwrap();

        let mut fields = Map::new();
        fields.insert("status".into(), json!("Delivered"));
        fields.insert("meta/completedAt".into(), json!("2024-06-01T10:00:00Z"));
        db.update("trips/t1", &fields).unwrap();

        let trip = db.get("trips/t1").unwrap().unwrap();
        assert_eq!(trip["status"], "Delivered");
        assert_eq!(trip["vehicleId"], "V1");
        assert_eq!(trip["meta"]["completedAt"], "2024-06-01T10:00:00Z");
    }

    #[test]
    fn push_keys_keep_insertion_order() {
        let db = make_test_db("tree_push");
        let a = db.push("stock_updates", &json!({"n": 1})).unwrap();
        let b = db.push("stock_updates", &json!({"n": 2})).unwrap();
        assert!(a < b);

        let all = db.get("stock_updates").unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[test]
    fn root_read_assembles_every_node() {
        let db = make_test_db("tree_root");
        db.set("loans/L1", &json!({"amount": 1000})).unwrap();
        db.set("vehicles/V1", &json!({"capacity": 5000})).unwrap();

        let root = db.get("/").unwrap().unwrap();
        assert_eq!(root["loans"]["L1"]["amount"], 1000);
        assert_eq!(root["vehicles"]["V1"]["capacity"], 5000);
    }
}
