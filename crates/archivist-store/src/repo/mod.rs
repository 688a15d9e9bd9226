//! Repository layer: SQLite implementation of the session store

pub mod sqlite_store;

pub use sqlite_store::SqliteStore;
