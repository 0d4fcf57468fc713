pub mod connection;
pub mod documents;
pub mod push_id;
pub mod tree;

pub use connection::Database;
