//! Core of the qwtd note tool.
//!
//! Owns the SQLite note store: generation probing, the migration chain, the
//! soft-delete/expiry lifecycle of notes and the startup sweep. UI layers
//! receive a ready `SqliteNoteRepository` and never touch migrations.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{default_config_path, ConfigError, CoreConfig};
pub use db::migrations::{latest_generation, MigrationContext, LATEST_GENERATION};
pub use db::{open_store, open_store_in_memory, DbError, DbResult, Store};
pub use logging::{default_log_dir, default_log_level, init_logging, logging_status};
pub use model::clock::{Clock, ManualClock, SystemClock};
pub use model::note::{format_duration, NoteState, NoteView};
pub use repo::note_repo::{
    NoteFilter, NoteRepository, RepoError, RepoResult, SqliteNoteRepository,
};
pub use service::bootstrap::{prepare_store, StartupError, StartupReport};
pub use service::note_service::{expiry_status, NoteService, NoteServiceError, OpenedNote};
pub use service::sweeper::run_startup_sweep;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
