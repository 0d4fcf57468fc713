use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::errors::MillError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slots, one per database file.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

/// Local SQLite mirror of both hosted stores.
#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    ///
    /// The connection is opened (and the schema applied) the first time this
    /// thread touches this database file.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, MillError>
    where
        F: FnOnce(&mut Connection) -> Result<T, MillError>,
    {
        DB_CONNS
            .try_with(|cell| {
                let mut conns = cell.borrow_mut();
                if !conns.contains_key(&self.path) {
                    let conn = Connection::open(&self.path)
                        .map_err(|e| MillError::DbError(format!("Open DB failed: {e}")))?;
                    conn.execute_batch(SCHEMA_SQL)
                        .map_err(|e| MillError::DbError(format!("Failed to apply schema: {e}")))?;
                    log::debug!("opened local store at {}", self.path);
                    conns.insert(self.path.clone(), conn);
                }
                match conns.get_mut(&self.path) {
                    Some(conn) => f(conn),
                    None => Err(MillError::DbError("connection slot missing".into())),
                }
            })
            .map_err(|_| MillError::DbError("thread-local connection unavailable".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::unique_temp_db_path;

    #[test]
    fn schema_is_applied_on_first_use() {
        let db = Database::new(unique_temp_db_path("connection"));
        let tables: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('tree_nodes', 'documents')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn separate_paths_get_separate_connections() {
        let a = Database::new(unique_temp_db_path("conn_a"));
        let b = Database::new(unique_temp_db_path("conn_b"));

        a.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tree_nodes (root, value, updated_at) VALUES ('x', '1', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let in_b: i64 = b
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tree_nodes", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(in_b, 0);
    }
}
