//! Key-value storage abstraction used by all persistence in the engine.

mod keys;
mod memory;
mod price_cache;
mod store;

pub use keys::UserKeys;
pub use memory::MemoryKeyValueStore;
pub use price_cache::KvCacheStore;
pub use store::KeyValueStore;
