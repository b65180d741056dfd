//! Durable key/value storage backing the request throttle.
//!
//! Values are plain strings keyed by plain strings; writes are upserts. The
//! `SQLite` implementation keeps one lazily opened connection that
//! [`KeyValueStore::close`] releases. An in-memory implementation serves
//! callers without a database and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;

use super::PersistenceError;
use super::migrator::{SchemaVersion, establish, run_migrations};

const KV_STORE_TABLE: &str = "kv_store";

/// String key/value store with upsert semantics.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Creates or replaces the value stored under `key`.
    async fn upsert(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Releases any underlying connection. Later calls may reopen it.
    async fn close(&self) -> Result<(), PersistenceError>;
}

/// SQLite-backed store using the `kv_store` table.
pub struct SqliteKeyValueStore {
    database_url: String,
    connection: Mutex<Option<SqliteConnection>>,
}

impl SqliteKeyValueStore {
    /// Creates a store targeting `database_url`. The connection opens on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
            connection: Mutex::new(None),
        })
    }

    /// Applies pending migrations on this store's own connection.
    ///
    /// Useful for `:memory:` databases, where every connection sees a fresh
    /// database.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the connection or a migration fails.
    pub fn migrate(&self) -> Result<SchemaVersion, PersistenceError> {
        self.with_connection(run_migrations)
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&mut SqliteConnection) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let mut guard = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            *guard = Some(establish(&self.database_url)?);
        }

        let Some(connection) = guard.as_mut() else {
            return Err(PersistenceError::ConnectionFailed {
                message: "connection unavailable after opening".to_owned(),
            });
        };

        operation(connection)
    }

    fn read(connection: &mut SqliteConnection, key: &str) -> Result<Option<String>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            value: String,
        }

        sql_query("SELECT value FROM kv_store WHERE key = ? LIMIT 1;")
            .bind::<Text, _>(key)
            .get_result::<Row>(connection)
            .optional()
            .map(|row| row.map(|found| found.value))
            .map_err(|error| {
                Self::map_error_with_schema_check(connection, &error, |message| {
                    PersistenceError::QueryFailed { message }
                })
            })
    }

    fn write(connection: &mut SqliteConnection, key: &str, value: &str) -> Result<(), PersistenceError> {
        sql_query(
            "INSERT INTO kv_store (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET \
               value = excluded.value, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(key)
        .bind::<Text, _>(value)
        .execute(connection)
        .map(drop)
        .map_err(|error| {
            Self::map_error_with_schema_check(connection, &error, |message| {
                PersistenceError::WriteFailed { message }
            })
        })
    }

    fn table_exists(connection: &mut SqliteConnection) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            one: i64,
        }

        let exists: Option<Row> = sql_query(
            "SELECT 1 AS one FROM sqlite_master WHERE type = 'table' AND name = ? LIMIT 1;",
        )
        .bind::<Text, _>(KV_STORE_TABLE)
        .get_result(connection)
        .optional()?;

        let _ = exists.as_ref().map(|row| row.one);
        Ok(exists.is_some())
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        match Self::table_exists(connection) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.with_connection(|connection| Self::read(connection, key))
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.with_connection(|connection| Self::write(connection, key, value))
    }

    async fn close(&self) -> Result<(), PersistenceError> {
        let mut guard = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(guard.take());
        Ok(())
    }
}

/// Process-local store for callers without a database.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn close(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
