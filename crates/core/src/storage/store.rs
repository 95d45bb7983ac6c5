//! Durable key-value store trait.

use async_trait::async_trait;

use crate::errors::Result;

/// Durable key-value store holding JSON strings under versioned key names.
///
/// All engine persistence (ledger, snapshots, time series, price cache) goes
/// through this trait. Values are opaque strings to the store; the services
/// own serialization. Schema evolution happens by bumping the version suffix
/// in the key name, never by migrating values in place.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`. Absent keys answer `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Answers whether a value existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// All keys currently present, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;
}
