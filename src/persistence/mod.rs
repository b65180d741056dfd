//! Local persistence and database migrations.
//!
//! The request throttle keeps its per-user state in a durable key/value store
//! so that quota and pacing survive process restarts. The `SQLite` schema is
//! managed with Diesel migrations so the database can be created and upgraded
//! consistently across machines.

mod error;
mod kv_store;
mod migrator;

pub use error::PersistenceError;
pub use kv_store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use migrator::{INITIAL_SCHEMA_VERSION, MIGRATIONS, SchemaVersion, migrate_database};

#[cfg(test)]
pub use kv_store::MockKeyValueStore;
