//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Upsert, read and list notes by name.
//! - Own the soft-delete state machine: live -> deleted -> (restored | swept).
//!
//! # Invariants
//! - `write` always leaves the note live and refreshes `date_modified`.
//! - `mark_deleted` sets `deleted` and `expires` in the same statement and
//!   never touches `content` or `date_modified`.
//! - `sweep_expired(now)` removes a deleted note iff `now > expires`.

use crate::db::migrations::LATEST_GENERATION;
use crate::db::schema::{table_exists, table_has_column};
use crate::db::{probe_generation, DbError};
use crate::model::clock::{duration_to_ms, Clock};
use crate::model::note::{validate_note_name, NoteView};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const NOTE_SELECT_SQL: &str = "SELECT
    name,
    content,
    date_modified,
    deleted,
    expires
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// No row with this name exists.
    NotFound(String),
    /// Name rejected before touching the store.
    InvalidName(String),
    /// Operation requires a soft-deleted note.
    NotDeleted(String),
    /// Store is not at the generation this repository expects.
    NotMigrated { generation: u32, expected: u32 },
    /// Persisted value violates a row invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(name) => write!(f, "note not found: `{name}`"),
            Self::InvalidName(reason) => write!(f, "invalid note name: {reason}"),
            Self::NotDeleted(name) => write!(f, "note `{name}` is not deleted"),
            Self::NotMigrated {
                generation,
                expected,
            } => write!(
                f,
                "store is at generation {generation}, repository requires {expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Which notes `list_notes` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteFilter {
    #[default]
    Live,
    Deleted,
    All,
}

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Returns the note, or `None` when no row exists yet.
    fn open(&self, name: &str) -> RepoResult<Option<NoteView>>;
    /// Upserts `content` under `name`; the note is live afterwards.
    fn write(&mut self, name: &str, content: &str) -> RepoResult<NoteView>;
    /// Soft-deletes the note with `expires = now + retention`.
    fn mark_deleted(&mut self, name: &str) -> RepoResult<NoteView>;
    /// Clears the deleted flag; `expires` is left in place.
    fn restore(&mut self, name: &str) -> RepoResult<NoteView>;
    /// Permanently removes one soft-deleted note.
    fn purge(&mut self, name: &str) -> RepoResult<()>;
    /// Permanently removes every deleted note whose expiry is before `now_ms`.
    fn sweep_expired(&mut self, now_ms: i64) -> RepoResult<usize>;
    /// Lists notes ordered by name.
    fn list_notes(&self, filter: NoteFilter) -> RepoResult<Vec<NoteView>>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn, C: Clock> {
    conn: &'conn mut Connection,
    clock: C,
    retention: Duration,
}

impl<'conn, C: Clock> SqliteNoteRepository<'conn, C> {
    /// Constructs a repository over a store already at the latest generation.
    pub fn try_new(conn: &'conn mut Connection, clock: C, retention: Duration) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            clock,
            retention,
        })
    }

    /// Grace period applied by `mark_deleted`.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Current time according to the repository clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

impl<C: Clock> NoteRepository for SqliteNoteRepository<'_, C> {
    fn open(&self, name: &str) -> RepoResult<Option<NoteView>> {
        load_note(self.conn, name)
    }

    fn write(&mut self, name: &str, content: &str) -> RepoResult<NoteView> {
        validate_note_name(name).map_err(RepoError::InvalidName)?;
        let now_ms = self.clock.now_ms();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO notes (name, content, date_modified, deleted, expires)
             VALUES (?1, ?2, ?3, 0, NULL)
             ON CONFLICT(name) DO UPDATE SET
                content = excluded.content,
                date_modified = excluded.date_modified,
                deleted = 0,
                expires = NULL;",
            params![name, content, now_ms],
        )?;
        let stored = load_note(&tx, name)?;
        tx.commit()?;

        debug!(
            "event=note_write module=repo status=ok chars={}",
            content.chars().count()
        );
        stored.ok_or_else(|| {
            RepoError::InvalidData("written note missing in read-back".to_string())
        })
    }

    fn mark_deleted(&mut self, name: &str) -> RepoResult<NoteView> {
        let expires = self
            .clock
            .now_ms()
            .saturating_add(duration_to_ms(self.retention));

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE notes SET deleted = 1, expires = ?2 WHERE name = ?1;",
            params![name, expires],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }
        let stored = load_note(&tx, name)?;
        tx.commit()?;

        info!("event=note_delete module=repo status=ok expires={expires}");
        stored.ok_or_else(|| RepoError::NotFound(name.to_string()))
    }

    fn restore(&mut self, name: &str) -> RepoResult<NoteView> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("UPDATE notes SET deleted = 0 WHERE name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }
        let stored = load_note(&tx, name)?;
        tx.commit()?;

        info!("event=note_restore module=repo status=ok");
        stored.ok_or_else(|| RepoError::NotFound(name.to_string()))
    }

    fn purge(&mut self, name: &str) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted: Option<i64> = tx
            .query_row("SELECT deleted FROM notes WHERE name = ?1;", [name], |row| {
                row.get(0)
            })
            .optional()?;
        match deleted {
            None => return Err(RepoError::NotFound(name.to_string())),
            Some(0) => return Err(RepoError::NotDeleted(name.to_string())),
            Some(_) => {}
        }
        tx.execute("DELETE FROM notes WHERE name = ?1;", [name])?;
        tx.commit()?;

        info!("event=note_purge module=repo status=ok");
        Ok(())
    }

    fn sweep_expired(&mut self, now_ms: i64) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM notes WHERE deleted = 1 AND expires < ?1;",
            [now_ms],
        )?;
        Ok(removed)
    }

    fn list_notes(&self, filter: NoteFilter) -> RepoResult<Vec<NoteView>> {
        let condition = match filter {
            NoteFilter::Live => " WHERE deleted = 0",
            NoteFilter::Deleted => " WHERE deleted = 1",
            NoteFilter::All => "",
        };
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL}{condition} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

fn load_note(conn: &Connection, name: &str) -> RepoResult<Option<NoteView>> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE name = ?1;"))?;
    let mut rows = stmt.query([name])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_note_row(row)?)),
        None => Ok(None),
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<NoteView> {
    let name: String = row.get("name")?;
    let deleted = match row.get::<_, i64>("deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in notes.deleted"
            )));
        }
    };
    let expires: Option<i64> = row.get("expires")?;
    if deleted && expires.is_none() {
        return Err(RepoError::InvalidData(format!(
            "deleted note `{name}` has no expiry"
        )));
    }

    Ok(NoteView {
        content: row.get::<_, Option<String>>("content")?.unwrap_or_default(),
        date_modified: row.get("date_modified")?,
        deleted,
        expires,
        name,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let generation = probe_generation(conn)?;
    if generation != LATEST_GENERATION {
        return Err(RepoError::NotMigrated {
            generation,
            expected: LATEST_GENERATION,
        });
    }

    if !table_exists(conn, "notes")? {
        return Err(RepoError::InvalidData("missing table `notes`".to_string()));
    }
    for column in ["name", "content", "date_modified", "deleted", "expires"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::InvalidData(format!(
                "missing column `notes.{column}`"
            )));
        }
    }
    Ok(())
}
