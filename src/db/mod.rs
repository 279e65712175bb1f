pub mod sqlite;

pub use sqlite::SqliteFlowStore;
