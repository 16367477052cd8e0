//! Store startup sequence.
//!
//! # Responsibility
//! - Fresh store: create the latest layout directly.
//! - Existing store: read its generation and migrate to latest.
//! - Run the expiration sweeper once, after the store is current.
//!
//! # Invariants
//! - A freshly created store never has its generation read and is never migrated.
//! - Migration and unknown-generation failures abort startup and name the
//!   store path; sweep failures never do.

use crate::db::migrations::{
    initialize_latest, migrate_to_latest, MigrationContext, LATEST_GENERATION,
};
use crate::db::{probe_generation, DbError, Store};
use crate::model::clock::Clock;
use crate::repo::note_repo::{RepoError, SqliteNoteRepository};
use crate::service::sweeper::run_startup_sweep;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// What the startup sequence did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// Generation after startup; always the latest on success.
    pub generation: u32,
    /// The store was brand-new and initialized directly.
    pub initialized: bool,
    /// Generation the store was migrated from, when a migration ran.
    pub migrated_from: Option<u32>,
    /// Notes removed by the sweeper, `None` when the sweep failed.
    pub swept: Option<usize>,
}

#[derive(Debug)]
pub enum StartupError {
    /// Initialization, probing or migration failed.
    Store { path: String, source: DbError },
    /// The migrated store does not have the expected layout.
    Repository { path: String, source: RepoError },
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store { path, source } => write!(f, "cannot prepare store {path}: {source}"),
            Self::Repository { path, source } => {
                write!(f, "store {path} is not usable: {source}")
            }
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Repository { source, .. } => Some(source),
        }
    }
}

/// Brings `store` to the latest generation and sweeps expired notes.
pub fn prepare_store<C: Clock>(
    store: &mut Store,
    retention: Duration,
    clock: C,
) -> Result<StartupReport, StartupError> {
    let path = store.display_path();
    let store_error = |source: DbError| StartupError::Store {
        path: path.clone(),
        source,
    };
    let now_ms = clock.now_ms();

    let (initialized, migrated_from) = if store.is_newly_created() {
        initialize_latest(store.connection_mut()).map_err(store_error)?;
        (true, None)
    } else {
        let from = probe_generation(store.connection()).map_err(store_error)?;
        let ctx = MigrationContext::new(now_ms, retention);
        migrate_to_latest(store.connection_mut(), &ctx).map_err(store_error)?;
        (false, (from != LATEST_GENERATION).then_some(from))
    };

    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, retention)
        .map_err(|source| StartupError::Repository {
            path: path.clone(),
            source,
        })?;
    let swept = run_startup_sweep(&mut repo, now_ms);

    info!(
        "event=startup module=service status=ok generation={} initialized={} migrated_from={:?} swept={:?}",
        LATEST_GENERATION, initialized, migrated_from, swept
    );
    Ok(StartupReport {
        generation: LATEST_GENERATION,
        initialized,
        migrated_from,
        swept,
    })
}
