//! Repository layer: the only code that reads or writes note rows.
//!
//! # Responsibility
//! - Define the note access contract used by services and the CLI.
//! - Isolate SQLite query details from startup orchestration.
//!
//! # Invariants
//! - Every mutation is a single atomic unit of work.
//! - A committed row never has `deleted = 1` without `expires`.

pub mod note_repo;
