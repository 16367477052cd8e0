//! SQLite store handle, generation lookup and schema migration entry points.
//!
//! # Responsibility
//! - Open the on-disk note store and remember whether it existed before.
//! - Read the persisted generation counter (`PRAGMA user_version`).
//! - Walk older stores forward through the migration chain.
//!
//! # Invariants
//! - The generation counter never decreases.
//! - Core code must not read/write notes before the store reaches the latest
//!   generation.
//! - A store that did not exist before opening is initialized directly at the
//!   latest generation and its counter is never read.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod probe;
pub(crate) mod schema;

pub use open::{open_store, open_store_in_memory, Store};
pub use probe::probe_generation;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// No migration step is registered for this generation and it is not the
    /// latest one. Either the store is corrupt or a newer tool wrote it.
    UnknownGeneration {
        /// Raw counter value; `user_version` is a signed 32-bit field.
        generation: i64,
        latest: u32,
    },
    /// A migration step returned a generation that is not strictly greater
    /// than the one it started from.
    MigrationStalled {
        from: u32,
        returned: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnknownGeneration { generation, latest } => write!(
                f,
                "store generation {generation} is unknown (latest supported is {latest}); \
                 the store may be corrupt or written by a newer version"
            ),
            Self::MigrationStalled { from, returned } => write!(
                f,
                "migration from generation {from} did not advance (returned {returned})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnknownGeneration { .. } | Self::MigrationStalled { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
