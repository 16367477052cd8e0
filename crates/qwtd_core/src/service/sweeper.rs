//! Expiration sweeper run once per store open.

use crate::repo::note_repo::NoteRepository;
use log::{error, info};

/// Permanently removes expired soft-deleted notes.
///
/// Best-effort: a failure is logged and reported as `None`, and the caller
/// continues startup. Unswept notes stay readable as deleted until the next
/// successful sweep.
pub fn run_startup_sweep<R: NoteRepository + ?Sized>(repo: &mut R, now_ms: i64) -> Option<usize> {
    match repo.sweep_expired(now_ms) {
        Ok(removed) => {
            info!("event=sweep module=service status=ok removed={removed} now_ms={now_ms}");
            Some(removed)
        }
        Err(err) => {
            error!("event=sweep module=service status=error error_code=sweep_failed error={err}");
            None
        }
    }
}
