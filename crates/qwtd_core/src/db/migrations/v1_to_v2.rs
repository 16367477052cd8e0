//! Generation 1 -> 2: strict note layout.
//!
//! Generation 1 writers declared `deleted INTEGER` and `expires TIMESTAMP`
//! without constraints, stored `datetime` text and could insert rows with a
//! NULL `deleted`. Generation 2 rebuilds the table with epoch-millisecond
//! integers and a non-null `deleted`.

use super::encoding::{ensure_soft_delete_columns, normalize_note_encodings};
use super::{MigrationContext, NOTES_COLUMNS_SQL};
use crate::db::DbResult;
use log::info;
use rusqlite::Transaction;

pub(super) fn apply(tx: &Transaction<'_>, ctx: &MigrationContext) -> DbResult<()> {
    ensure_soft_delete_columns(tx)?;
    normalize_note_encodings(tx, ctx)?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS notes_rebuild;
         CREATE TABLE notes_rebuild {NOTES_COLUMNS_SQL};
         INSERT INTO notes_rebuild (name, content, date_modified, deleted, expires)
         SELECT name, COALESCE(content, ''), date_modified, deleted, expires
         FROM notes;
         DROP TABLE notes;
         ALTER TABLE notes_rebuild RENAME TO notes;"
    ))?;

    let rows: i64 = tx.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
    info!("event=migrate_v1_v2 module=db status=ok rows={rows}");
    Ok(())
}
