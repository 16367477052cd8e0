//! Store generation registry and migration engine.
//!
//! # Responsibility
//! - Register one migration step per known past generation.
//! - Apply a single step atomically, or drive the chain up to the latest
//!   generation.
//! - Initialize brand-new stores directly at the latest layout.
//!
//! # Invariants
//! - Every step moves generation `N` to `N + 1` and nothing else.
//! - The step body and the `PRAGMA user_version` bump commit in one
//!   transaction; a failed step leaves the counter at `N`.
//! - Step bodies must converge when re-run from the pre-step state.

use crate::db::{probe_generation, DbError, DbResult};
use crate::model::clock::duration_to_ms;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

mod encoding;
mod v0_to_v1;
mod v1_to_v2;

/// Generation written by this build.
pub const LATEST_GENERATION: u32 = 2;

const NOTES_COLUMNS_SQL: &str = "(
    name TEXT PRIMARY KEY,
    content TEXT NOT NULL DEFAULT '',
    date_modified INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    expires INTEGER
)";

/// Inputs a migration step may depend on besides the store itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationContext {
    /// Migration wall-clock time in epoch milliseconds.
    pub now_ms: i64,
    /// Grace period applied to notes that a step marks as deleted.
    pub retention: Duration,
}

impl MigrationContext {
    pub fn new(now_ms: i64, retention: Duration) -> Self {
        Self { now_ms, retention }
    }

    /// Expiry instant for a note deleted during this migration.
    pub fn expiry_from_now(&self) -> i64 {
        self.now_ms.saturating_add(duration_to_ms(self.retention))
    }
}

type StepFn = fn(&Transaction<'_>, &MigrationContext) -> DbResult<()>;

#[derive(Clone, Copy)]
struct Migration {
    from: u32,
    description: &'static str,
    apply: StepFn,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 0,
        description: "per-note deleted flag and expiry replace last_deleted",
        apply: v0_to_v1::apply,
    },
    Migration {
        from: 1,
        description: "rebuild notes with integer timestamps and non-null deleted",
        apply: v1_to_v2::apply,
    },
];

/// Returns the latest generation known by this binary.
pub fn latest_generation() -> u32 {
    LATEST_GENERATION
}

/// Creates the latest layout on a brand-new store.
///
/// Only valid when the store file did not exist before it was opened; no
/// migration step runs.
pub fn initialize_latest(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(&format!("CREATE TABLE IF NOT EXISTS notes {NOTES_COLUMNS_SQL};"))?;
    set_generation(&tx, LATEST_GENERATION)?;
    tx.commit()?;
    info!(
        "event=db_init module=db status=ok generation={}",
        LATEST_GENERATION
    );
    Ok(())
}

/// Applies the single step registered for `from` and returns the resulting
/// generation.
///
/// At the latest generation this is a no-op returning the same value.
///
/// # Errors
/// - `DbError::UnknownGeneration` when `from` has no registered step. Not
///   retryable.
/// - `DbError::Sqlite` when the step fails; nothing is committed and the
///   step may be retried from the same generation.
pub fn migrate_step(conn: &mut Connection, from: u32, ctx: &MigrationContext) -> DbResult<u32> {
    if from == LATEST_GENERATION {
        return Ok(LATEST_GENERATION);
    }

    let migration = MIGRATIONS
        .iter()
        .find(|migration| migration.from == from)
        .ok_or(DbError::UnknownGeneration {
            generation: i64::from(from),
            latest: LATEST_GENERATION,
        })?;
    let to = from + 1;

    info!(
        "event=migrate_step module=db status=start from={} to={} step=\"{}\"",
        from, to, migration.description
    );
    let result = run_in_transaction(conn, migration, to, ctx);
    match &result {
        Ok(()) => info!("event=migrate_step module=db status=ok from={from} to={to}"),
        Err(err) => error!(
            "event=migrate_step module=db status=error from={from} to={to} error={err}"
        ),
    }
    result.map(|()| to)
}

/// Reads the store generation and applies steps until it reaches the latest generation.
///
/// Returns the final generation, which is always `LATEST_GENERATION` on
/// success.
pub fn migrate_to_latest(conn: &mut Connection, ctx: &MigrationContext) -> DbResult<u32> {
    let mut generation = probe_generation(conn)?;
    if generation == LATEST_GENERATION {
        info!("event=migrate module=db status=skipped generation={generation}");
        return Ok(generation);
    }

    info!(
        "event=migrate module=db status=start from={} latest={}",
        generation, LATEST_GENERATION
    );
    while generation != LATEST_GENERATION {
        let next = migrate_step(conn, generation, ctx)?;
        if next <= generation {
            return Err(DbError::MigrationStalled {
                from: generation,
                returned: next,
            });
        }
        generation = next;
    }
    info!("event=migrate module=db status=ok generation={generation}");
    Ok(generation)
}

fn run_in_transaction(
    conn: &mut Connection,
    migration: &Migration,
    to: u32,
    ctx: &MigrationContext,
) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    (migration.apply)(&tx, ctx)?;
    set_generation(&tx, to)?;
    tx.commit()?;
    Ok(())
}

fn set_generation(tx: &Transaction<'_>, generation: u32) -> DbResult<()> {
    tx.pragma_update(None, "user_version", generation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MigrationContext, LATEST_GENERATION, MIGRATIONS};
    use std::time::Duration;

    #[test]
    fn registry_covers_every_generation_below_latest() {
        for generation in 0..LATEST_GENERATION {
            let count = MIGRATIONS
                .iter()
                .filter(|migration| migration.from == generation)
                .count();
            assert_eq!(count, 1, "generation {generation} needs exactly one step");
        }
        assert!(MIGRATIONS.iter().all(|m| m.from < LATEST_GENERATION));
    }

    #[test]
    fn expiry_adds_retention_to_now() {
        let ctx = MigrationContext::new(1_000, Duration::from_secs(2));
        assert_eq!(ctx.expiry_from_now(), 3_000);
    }
}
