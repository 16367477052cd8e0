//! Startup orchestration and editor-facing note use-cases.
//!
//! # Responsibility
//! - Bring an opened store to the latest generation and sweep it once.
//! - Offer open/save/delete/restore/export flows to the UI layer without
//!   exposing SQL or migrations.

pub mod bootstrap;
pub mod note_service;
pub mod sweeper;
