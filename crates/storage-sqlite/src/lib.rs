//! SQLite storage implementation for Coinfolio.
//!
//! The engine persists everything (ledger, snapshots, time series, price
//! cache) as JSON strings behind the `KeyValueStore` trait from
//! `coinfolio-core`. This crate is the only place Diesel appears; core and
//! market-data stay storage-agnostic and work against the trait.

pub mod db;
pub mod errors;
pub mod kv;
pub mod schema;

pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};
pub use errors::SqliteStorageError;
pub use kv::SqliteKeyValueStore;
