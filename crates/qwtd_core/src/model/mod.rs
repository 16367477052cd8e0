//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and its soft-delete state.
//! - Provide time helpers used by the deletion/expiration lifecycle.
//!
//! # Invariants
//! - A note is identified by its unique `name`.
//! - `expires` is meaningful only while `deleted` is true.

pub mod clock;
pub mod note;
