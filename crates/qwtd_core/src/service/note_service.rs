//! Editor-facing note use-cases.
//!
//! # Responsibility
//! - Open-or-seed a note for editing, save it, and drive soft delete/restore.
//! - Export a note body to a markdown file.
//! - Render deletion/expiry status for title bars.
//!
//! # Invariants
//! - Opening a missing note is not an error; it yields a fresh document that
//!   is only persisted on the first save.
//! - Saving a deleted note un-deletes it.

use crate::model::note::{format_duration, NoteState, NoteView};
use crate::repo::note_repo::{NoteFilter, NoteRepository, RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const EXPORT_EXTENSION: &str = "md";

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    InvalidName(String),
    NoteNotFound(String),
    NotDeleted(String),
    /// Export target is not an existing directory.
    InvalidExportDir(PathBuf),
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(reason) => write!(f, "invalid note name: {reason}"),
            Self::NoteNotFound(name) => write!(f, "note not found: `{name}`"),
            Self::NotDeleted(name) => write!(f, "note `{name}` is not deleted"),
            Self::InvalidExportDir(path) => {
                write!(f, "export path is not a directory: {}", path.display())
            }
            Self::Export { path, source } => {
                write!(f, "failed to export to {}: {source}", path.display())
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Export { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(name) => Self::NoteNotFound(name),
            RepoError::InvalidName(reason) => Self::InvalidName(reason),
            RepoError::NotDeleted(name) => Self::NotDeleted(name),
            other => Self::Repo(other),
        }
    }
}

/// A note loaded into the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedNote {
    pub name: String,
    /// Stored body, or the seeded template for a new note.
    pub content: String,
    /// Stored row; `None` until the first save.
    pub stored: Option<NoteView>,
}

impl OpenedNote {
    pub fn is_new(&self) -> bool {
        self.stored.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.stored.as_ref().is_some_and(|note| note.deleted)
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Opens `name`; a missing note yields a `# <name>` heading template.
    pub fn open_note(&self, name: &str) -> Result<OpenedNote, NoteServiceError> {
        let stored = self.repo.open(name)?;
        let content = match &stored {
            Some(note) => note.content.clone(),
            None => new_note_template(name),
        };
        Ok(OpenedNote {
            name: name.to_string(),
            content,
            stored,
        })
    }

    pub fn save_note(&mut self, name: &str, content: &str) -> Result<NoteView, NoteServiceError> {
        Ok(self.repo.write(name, content)?)
    }

    pub fn delete_note(&mut self, name: &str) -> Result<NoteView, NoteServiceError> {
        Ok(self.repo.mark_deleted(name)?)
    }

    pub fn restore_note(&mut self, name: &str) -> Result<NoteView, NoteServiceError> {
        Ok(self.repo.restore(name)?)
    }

    /// Permanently removes a note that is already soft-deleted.
    pub fn purge_note(&mut self, name: &str) -> Result<(), NoteServiceError> {
        Ok(self.repo.purge(name)?)
    }

    pub fn list_notes(&self, filter: NoteFilter) -> RepoResult<Vec<NoteView>> {
        self.repo.list_notes(filter)
    }

    /// Names offered by the note picker.
    pub fn list_names(&self, filter: NoteFilter) -> RepoResult<Vec<String>> {
        Ok(self
            .repo
            .list_notes(filter)?
            .into_iter()
            .map(|note| note.name)
            .collect())
    }

    /// Writes the stored body of `name` to `<dir>/<name>.md`, replacing any
    /// existing file, and returns the written path.
    pub fn export_note(&self, name: &str, dir: &Path) -> Result<PathBuf, NoteServiceError> {
        let note = self
            .repo
            .open(name)?
            .ok_or_else(|| NoteServiceError::NoteNotFound(name.to_string()))?;
        if !dir.is_dir() {
            return Err(NoteServiceError::InvalidExportDir(dir.to_path_buf()));
        }

        let path = dir.join(format!("{}.{EXPORT_EXTENSION}", export_file_stem(name)));
        std::fs::write(&path, note.content.as_bytes()).map_err(|source| {
            NoteServiceError::Export {
                path: path.clone(),
                source,
            }
        })?;
        info!("event=note_export module=service status=ok bytes={}", note.content.len());
        Ok(path)
    }

    pub fn into_inner(self) -> R {
        self.repo
    }
}

/// Title-bar status for a note, `None` while it is live.
pub fn expiry_status(note: &NoteView, now_ms: i64) -> Option<String> {
    match note.state() {
        NoteState::Live => None,
        NoteState::Deleted { .. } if note.is_expired_at(now_ms) => {
            Some("DELETED: expired, removed on next start".to_string())
        }
        NoteState::Deleted { .. } => note
            .time_until_expiry(now_ms)
            .map(|left| format!("DELETED: expires in {}", format_duration(left))),
    }
}

fn new_note_template(name: &str) -> String {
    format!("# {name}\n\n")
}

fn export_file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}
