//! Generation 0 -> 1: per-note soft delete.
//!
//! Generation 0 could hold one deleted note at a time: the note was renamed
//! to the sentinel name `Deleted` and its real name was kept in the
//! single-row `last_deleted` table (`Deleted` there means "nothing deleted").
//! Generation 1 tracks `deleted`/`expires` on every row instead.

use super::encoding::{ensure_soft_delete_columns, normalize_note_encodings};
use super::MigrationContext;
use crate::db::schema::table_exists;
use crate::db::DbResult;
use log::{info, warn};
use rusqlite::{params, OptionalExtension, Transaction};

/// Note name used by generation 0 for the deleted slot.
const LEGACY_SENTINEL: &str = "Deleted";

pub(super) fn apply(tx: &Transaction<'_>, ctx: &MigrationContext) -> DbResult<()> {
    // Pre-versioning stores always had this table; an empty file may not.
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS notes (
            name TEXT PRIMARY KEY,
            content TEXT,
            date_modified TIMESTAMP
        );",
    )?;

    // A partial run by an older writer may already have added the columns,
    // with text expiries on every row; normalization converges either way.
    ensure_soft_delete_columns(tx)?;
    normalize_note_encodings(tx, ctx)?;

    if table_exists(tx, "last_deleted")? {
        let marker: Option<Option<String>> = tx
            .query_row("SELECT * FROM last_deleted LIMIT 1;", [], |row| row.get(0))
            .optional()?;
        match marker.flatten() {
            Some(target) if target != LEGACY_SENTINEL => {
                translate_deleted_slot(tx, &target, ctx.expiry_from_now())?;
            }
            _ => info!("event=migrate_v0_v1 module=db status=ok legacy_deleted=none"),
        }
        tx.execute_batch("DROP TABLE last_deleted;")?;
    }

    Ok(())
}

fn translate_deleted_slot(tx: &Transaction<'_>, target: &str, expires: i64) -> DbResult<()> {
    let target_taken: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE name = ?1);",
        [target],
        |row| row.get(0),
    )?;

    let changed = if target_taken {
        // The original name was reused after deletion; keep the sentinel name.
        warn!("event=migrate_v0_v1 module=db status=warn reason=target_name_taken");
        tx.execute(
            "UPDATE notes SET deleted = 1, expires = ?2 WHERE name = ?1;",
            params![LEGACY_SENTINEL, expires],
        )?
    } else {
        tx.execute(
            "UPDATE notes SET name = ?1, deleted = 1, expires = ?3 WHERE name = ?2;",
            params![target, LEGACY_SENTINEL, expires],
        )?
    };

    if changed == 0 {
        warn!("event=migrate_v0_v1 module=db status=warn reason=sentinel_note_missing");
    } else {
        info!("event=migrate_v0_v1 module=db status=ok legacy_deleted=restored_name");
    }
    Ok(())
}
