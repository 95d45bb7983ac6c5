//! Database row for the key-value table.

use diesel::prelude::*;

/// One row of the `kv_store` table. `updated_at` is an RFC 3339 timestamp
/// kept for inspection; nothing reads it back.
#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::kv_store)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
