use crate::db::connection::Database;
use std::time::{SystemTime, UNIX_EPOCH};

/// A database file path no other test uses.
pub fn unique_temp_db_path(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir()
        .join(format!("millbook_{prefix}_{}_{nanos}.sqlite3", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

/// Fresh database with the production schema applied on first use.
pub fn make_test_db(prefix: &str) -> Database {
    Database::new(unique_temp_db_path(prefix))
}
