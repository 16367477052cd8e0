//! Store handle bootstrap for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Record whether the store file existed before it was opened.
//! - Configure connection pragmas required by core behavior.
//!
//! # Invariants
//! - File existence is checked before `Connection::open`, since opening
//!   creates the file.
//! - Returned handles are NOT migrated; see `service::bootstrap`.

use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusively owned handle to one note store.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    newly_created: bool,
}

impl Store {
    /// Shared access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access, needed to open transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Backing file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human-readable location used in logs and error messages.
    pub fn display_path(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    /// Whether the backing file did not exist before this handle opened it.
    pub fn is_newly_created(&self) -> bool {
        self.newly_created
    }

    /// Closes the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> DbResult<()> {
        let location = self.display_path();
        match self.conn.close() {
            Ok(()) => {
                info!("event=db_close module=db status=ok path={location}");
                Ok(())
            }
            Err((_, err)) => {
                error!("event=db_close module=db status=error path={location} error={err}");
                Err(err.into())
            }
        }
    }
}

/// Opens (or creates) the store file at `path`.
///
/// # Side effects
/// - Creates the file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_store(path: impl AsRef<Path>) -> DbResult<Store> {
    let path = path.as_ref();
    let started_at = Instant::now();
    let newly_created = !path.exists();
    info!(
        "event=db_open module=db status=start mode=file newly_created={} path={}",
        newly_created,
        path.display()
    );

    let conn = Connection::open(path).and_then(|conn| {
        configure_connection(&conn)?;
        Ok(conn)
    });
    match conn {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(Store {
                conn,
                path: Some(path.to_path_buf()),
                newly_created,
            })
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

/// Opens an empty in-memory store. Always reported as newly created.
pub fn open_store_in_memory() -> DbResult<Store> {
    info!("event=db_open module=db status=start mode=memory");
    let conn = Connection::open_in_memory()?;
    configure_connection(&conn)?;
    info!("event=db_open module=db status=ok mode=memory");
    Ok(Store {
        conn,
        path: None,
        newly_created: true,
    })
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
}
