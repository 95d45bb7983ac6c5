//! SQLite-backed implementation of the engine's key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use coinfolio_core::errors::{Error, Result, StorageError};
use coinfolio_core::storage::KeyValueStore;

use super::model::KvEntry;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::schema::kv_store;

/// Key-value store over one SQLite table.
///
/// Reads go straight to the pool; writes are funneled through the writer
/// actor so they serialize instead of contending for the database lock.
pub struct SqliteKeyValueStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteKeyValueStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SqliteKeyValueStore { pool, writer }
    }
}

fn read_failed(key: &str, err: impl std::fmt::Display) -> Error {
    Error::Storage(StorageError::ReadFailed {
        key: key.to_string(),
        message: err.to_string(),
    })
}

fn write_failed(key: &str, err: impl std::fmt::Display) -> Error {
    Error::Storage(StorageError::WriteFailed {
        key: key.to_string(),
        message: err.to_string(),
    })
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        kv_store::table
            .find(key)
            .select(kv_store::value)
            .first::<String>(&mut conn)
            .optional()
            .map_err(|e| read_failed(key, e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = KvEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };
        let key = key.to_string();

        self.writer
            .exec(move |conn| {
                diesel::replace_into(kv_store::table)
                    .values(&entry)
                    .execute(conn)
                    .map_err(|e| write_failed(&key, e))?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();

        self.writer
            .exec(move |conn| {
                let deleted = diesel::delete(kv_store::table.find(&key))
                    .execute(conn)
                    .map_err(|e| write_failed(&key, e))?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        kv_store::table
            .select(kv_store::key)
            .load::<String>(&mut conn)
            .map_err(|e| Error::Storage(StorageError::Internal(format!("key listing failed: {}", e))))
    }
}
