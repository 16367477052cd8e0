//! Note record and soft-delete state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on note names, in characters.
pub const MAX_NOTE_NAME_CHARS: usize = 255;

/// Read model returned by the repository for one stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    /// Unique note name (primary key).
    pub name: String,
    /// Raw markdown body.
    pub content: String,
    /// Last successful write, epoch milliseconds.
    pub date_modified: i64,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Eligible for sweeping after this instant (epoch milliseconds).
    /// Ignored while `deleted` is false.
    pub expires: Option<i64>,
}

impl NoteView {
    /// Lifecycle state derived from the stored flags.
    pub fn state(&self) -> NoteState {
        match (self.deleted, self.expires) {
            (false, _) => NoteState::Live,
            (true, Some(expires)) => NoteState::Deleted { expires },
            (true, None) => NoteState::Deleted { expires: i64::MIN },
        }
    }

    /// Whether the sweep at `now_ms` would permanently remove this note.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.state(), NoteState::Deleted { expires } if now_ms > expires)
    }

    /// Time left before the note becomes sweepable, `None` for live notes.
    /// Already-expired notes report `Duration::ZERO`.
    pub fn time_until_expiry(&self, now_ms: i64) -> Option<Duration> {
        match self.state() {
            NoteState::Live => None,
            NoteState::Deleted { expires } => {
                let remaining = expires.saturating_sub(now_ms).max(0);
                Some(Duration::from_millis(remaining as u64))
            }
        }
    }
}

/// Lifecycle state of one note row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Live,
    Deleted { expires: i64 },
}

/// Validates a note name before it is used as a key.
pub fn validate_note_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("note name cannot be blank".to_string());
    }
    if name.chars().count() > MAX_NOTE_NAME_CHARS {
        return Err(format!(
            "note name exceeds {MAX_NOTE_NAME_CHARS} characters"
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("note name cannot contain control characters".to_string());
    }
    Ok(())
}

/// Formats a duration in its most significant unit, e.g. `9 days` or
/// `36 minutes`.
pub fn format_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let secs = duration.as_secs();
    let (value, unit) = if secs >= DAY {
        (secs / DAY, "day")
    } else if secs > HOUR {
        (secs / HOUR, "hour")
    } else if secs > MINUTE {
        (secs / MINUTE, "minute")
    } else if secs > 0 {
        (secs, "second")
    } else {
        (u64::from(duration.subsec_micros()), "microsecond")
    };
    format!("{value} {unit}{}", if value == 1 { "" } else { "s" })
}
