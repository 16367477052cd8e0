//! Row encoding repair shared by migration steps.
//!
//! Older writers stored timestamps as `datetime` text, could leave `deleted`
//! NULL, and stamped `expires` on live rows. After `normalize_note_encodings`
//! every row has an integer `date_modified`, `deleted` in {0, 1}, a NULL
//! `expires` when live and an integer `expires` when deleted.

use super::MigrationContext;
use crate::db::schema::table_has_column;
use crate::db::DbResult;
use log::info;
use rusqlite::{params, Transaction};

/// Adds the soft-delete columns when a previous writer has not.
pub(super) fn ensure_soft_delete_columns(tx: &Transaction<'_>) -> DbResult<()> {
    if !table_has_column(tx, "notes", "deleted")? {
        tx.execute_batch("ALTER TABLE notes ADD COLUMN deleted INTEGER NOT NULL DEFAULT 0;")?;
    }
    if !table_has_column(tx, "notes", "expires")? {
        tx.execute_batch("ALTER TABLE notes ADD COLUMN expires INTEGER;")?;
    }
    Ok(())
}

/// Rewrites legacy encodings in place. Rows already in the current encoding
/// are left untouched, so re-running is a no-op.
pub(super) fn normalize_note_encodings(
    tx: &Transaction<'_>,
    ctx: &MigrationContext,
) -> DbResult<()> {
    let flags = tx.execute(
        "UPDATE notes
         SET deleted = CASE WHEN deleted IS NULL OR deleted = 0 THEN 0 ELSE 1 END
         WHERE deleted IS NULL OR deleted NOT IN (0, 1);",
        [],
    )?;

    let modified = tx.execute(
        &format!(
            "UPDATE notes
             SET date_modified = COALESCE({}, ?1)
             WHERE typeof(date_modified) <> 'integer';",
            epoch_ms_expr("date_modified")
        ),
        [ctx.now_ms],
    )?;

    let cleared = tx.execute(
        "UPDATE notes SET expires = NULL WHERE deleted = 0 AND expires IS NOT NULL;",
        [],
    )?;
    let expiries = tx.execute(
        &format!(
            "UPDATE notes
             SET expires = COALESCE({}, ?1)
             WHERE deleted = 1
               AND (expires IS NULL OR typeof(expires) <> 'integer');",
            epoch_ms_expr("expires")
        ),
        params![ctx.expiry_from_now()],
    )?;

    if flags + modified + cleared + expiries > 0 {
        info!(
            "event=migrate_normalize module=db status=ok flags={} date_modified={} expires_cleared={} expires_converted={}",
            flags, modified, cleared, expiries
        );
    }
    Ok(())
}

/// SQL expression converting `column` to epoch milliseconds. Text is parsed
/// as a UTC date-time; unparseable or NULL values yield NULL.
fn epoch_ms_expr(column: &str) -> String {
    format!(
        "CASE typeof({column})
             WHEN 'integer' THEN {column}
             WHEN 'real' THEN CAST({column} AS INTEGER)
             WHEN 'text' THEN CAST(ROUND((julianday({column}) - 2440587.5) * 86400000.0) AS INTEGER)
             ELSE NULL
         END"
    )
}

#[cfg(test)]
mod tests {
    use super::{ensure_soft_delete_columns, normalize_note_encodings};
    use crate::db::migrations::MigrationContext;
    use rusqlite::Connection;
    use std::time::Duration;

    const NOW_MS: i64 = 1_700_000_000_000;
    const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

    fn legacy_rows() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (name TEXT PRIMARY KEY, content TEXT, date_modified TIMESTAMP,
                                 deleted INTEGER, expires TIMESTAMP);
             INSERT INTO notes VALUES ('live', 'a', '2024-03-01 10:00:00', NULL, NULL);
             INSERT INTO notes VALUES ('stamped', 'b', NULL, 0, '2024-03-05 09:00:00');
             INSERT INTO notes VALUES ('gone', 'c', 5, 1, '2024-03-05 09:00:00');
             INSERT INTO notes VALUES ('gone_blank', 'd', 6, 1, NULL);",
        )
        .unwrap();
        conn
    }

    fn row(conn: &Connection, name: &str) -> (i64, i64, Option<i64>) {
        conn.query_row(
            "SELECT date_modified, deleted, expires FROM notes WHERE name = ?1;",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap()
    }

    #[test]
    fn legacy_encodings_become_integers() {
        let mut conn = legacy_rows();
        let ctx = MigrationContext::new(NOW_MS, Duration::from_millis(WEEK_MS as u64));
        let tx = conn.transaction().unwrap();
        ensure_soft_delete_columns(&tx).unwrap();
        normalize_note_encodings(&tx, &ctx).unwrap();
        tx.commit().unwrap();

        assert_eq!(row(&conn, "live"), (1_709_287_200_000, 0, None));
        assert_eq!(row(&conn, "stamped"), (NOW_MS, 0, None));
        assert_eq!(row(&conn, "gone"), (5, 1, Some(1_709_629_200_000)));
        assert_eq!(row(&conn, "gone_blank"), (6, 1, Some(NOW_MS + WEEK_MS)));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut conn = legacy_rows();
        let first = MigrationContext::new(NOW_MS, Duration::from_millis(WEEK_MS as u64));
        let tx = conn.transaction().unwrap();
        normalize_note_encodings(&tx, &first).unwrap();
        tx.commit().unwrap();
        let before = row(&conn, "gone_blank");

        let later = MigrationContext::new(NOW_MS + 1_000, Duration::from_millis(WEEK_MS as u64));
        let tx = conn.transaction().unwrap();
        normalize_note_encodings(&tx, &later).unwrap();
        tx.commit().unwrap();

        assert_eq!(row(&conn, "gone_blank"), before);
        assert_eq!(row(&conn, "stamped"), (NOW_MS, 0, None));
    }
}
