//! Reads the persisted generation counter.

use super::migrations::LATEST_GENERATION;
use super::{DbError, DbResult};
use rusqlite::Connection;

/// Reads the generation counter stored in `PRAGMA user_version`.
///
/// Read-only. Callers must not read the generation of a store that was just created: a
/// counter of 0 cannot tell a fresh file apart from a pre-versioning store.
///
/// # Errors
/// - `DbError::UnknownGeneration` when the counter is negative.
pub fn probe_generation(conn: &Connection) -> DbResult<u32> {
    let raw = conn.pragma_query_value(None, "user_version", |row| row.get::<_, i64>(0))?;
    u32::try_from(raw).map_err(|_| DbError::UnknownGeneration {
        generation: raw,
        latest: LATEST_GENERATION,
    })
}
