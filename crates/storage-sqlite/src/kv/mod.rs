//! SQLite implementation of the engine's key-value store.

mod model;
mod repository;

pub use model::KvEntry;
pub use repository::SqliteKeyValueStore;
