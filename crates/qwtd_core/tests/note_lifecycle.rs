use qwtd_core::db::open_store_in_memory;
use qwtd_core::db::DbError;
use qwtd_core::{
    prepare_store, Clock, ManualClock, NoteFilter, NoteRepository, NoteService, NoteServiceError,
    NoteView, RepoError, SqliteNoteRepository, Store, LATEST_GENERATION,
};
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const START_MS: i64 = 1_700_000_000_000;

fn ready_store(clock: &ManualClock) -> Store {
    let mut store = open_store_in_memory().unwrap();
    prepare_store(&mut store, WEEK, clock).unwrap();
    store
}

#[test]
fn full_lifecycle_sweeps_only_after_retention_window() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    assert!(repo.open("gains").unwrap().is_none());
    repo.write("gains", "hello").unwrap();
    repo.mark_deleted("gains").unwrap();

    assert_eq!(repo.sweep_expired(clock.now_ms()).unwrap(), 0);
    let still_there = repo.open("gains").unwrap().unwrap();
    assert!(still_there.deleted);
    assert_eq!(still_there.content, "hello");

    clock.advance(DAY * 8);
    assert_eq!(repo.sweep_expired(clock.now_ms()).unwrap(), 1);
    assert!(repo.open("gains").unwrap().is_none());
}

#[test]
fn delete_then_restore_preserves_content_and_timestamp() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    let written = repo.write("gains", "hello").unwrap();
    clock.advance(Duration::from_secs(60));
    let deleted = repo.mark_deleted("gains").unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.expires, Some(clock.now_ms() + 7 * 86_400_000));

    clock.advance(Duration::from_secs(60));
    let restored = repo.restore("gains").unwrap();
    assert!(!restored.deleted);
    assert_eq!(restored.content, written.content);
    assert_eq!(restored.date_modified, written.date_modified);
}

#[test]
fn write_clears_deletion_and_refreshes_timestamp() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    repo.write("gains", "hello").unwrap();
    repo.mark_deleted("gains").unwrap();
    clock.advance(Duration::from_secs(5));

    let saved = repo.write("gains", "hello again").unwrap();
    assert!(!saved.deleted);
    assert_eq!(saved.expires, None);
    assert_eq!(saved.date_modified, START_MS + 5_000);
    assert_eq!(saved.content, "hello again");
}

#[test]
fn sweep_boundary_is_strictly_after_expiry() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    repo.write("gains", "hello").unwrap();
    let expires = repo.mark_deleted("gains").unwrap().expires.unwrap();

    assert_eq!(repo.sweep_expired(expires - 1).unwrap(), 0);
    assert_eq!(repo.sweep_expired(expires).unwrap(), 0);
    let untouched = repo.open("gains").unwrap().unwrap();
    assert!(untouched.deleted);
    assert_eq!(untouched.expires, Some(expires));

    assert_eq!(repo.sweep_expired(expires + 1).unwrap(), 1);
    assert!(repo.open("gains").unwrap().is_none());
}

#[test]
fn sweep_never_touches_live_notes_with_stale_expiry() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    repo.write("gains", "hello").unwrap();
    repo.mark_deleted("gains").unwrap();
    repo.restore("gains").unwrap();

    clock.advance(DAY * 30);
    assert_eq!(repo.sweep_expired(clock.now_ms()).unwrap(), 0);
    assert!(!repo.open("gains").unwrap().unwrap().deleted);
}

#[test]
fn missing_notes_report_not_found_for_mutations() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    assert!(matches!(
        repo.mark_deleted("ghost"),
        Err(RepoError::NotFound(name)) if name == "ghost"
    ));
    assert!(matches!(repo.restore("ghost"), Err(RepoError::NotFound(_))));
    assert!(matches!(repo.purge("ghost"), Err(RepoError::NotFound(_))));
}

#[test]
fn purge_requires_soft_deleted_note() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    repo.write("gains", "hello").unwrap();
    assert!(matches!(repo.purge("gains"), Err(RepoError::NotDeleted(_))));

    repo.mark_deleted("gains").unwrap();
    repo.purge("gains").unwrap();
    assert!(repo.open("gains").unwrap().is_none());
}

#[test]
fn blank_names_are_rejected_before_writing() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    assert!(matches!(repo.write("  ", "x"), Err(RepoError::InvalidName(_))));
    assert!(repo.list_notes(NoteFilter::All).unwrap().is_empty());
}

#[test]
fn list_filters_by_deletion_state_in_name_order() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();

    for name in ["zeta", "alpha", "mid"] {
        repo.write(name, "body").unwrap();
    }
    repo.mark_deleted("mid").unwrap();

    let names = |filter| {
        repo.list_notes(filter)
            .unwrap()
            .into_iter()
            .map(|note| note.name)
            .collect::<Vec<_>>()
    };
    assert_eq!(names(NoteFilter::Live), vec!["alpha", "zeta"]);
    assert_eq!(names(NoteFilter::Deleted), vec!["mid"]);
    assert_eq!(names(NoteFilter::All), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut store = open_store_in_memory().unwrap();
    let clock = ManualClock::new(START_MS);
    let err = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK)
        .err()
        .expect("unmigrated store must be rejected");
    assert!(matches!(
        err,
        RepoError::NotMigrated {
            generation: 0,
            expected: LATEST_GENERATION
        }
    ));
}

#[test]
fn failed_rewrite_of_deleted_note_keeps_row_intact() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let before = seed_note(&mut store, &clock, "gains", true);
    abort_on(&store, "UPDATE");

    clock.advance(Duration::from_secs(60));
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let err = repo.write("gains", "rewritten").unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))), "{err}");
    assert_eq!(repo.open("gains").unwrap(), Some(before));
}

#[test]
fn failed_mark_deleted_keeps_note_live() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let before = seed_note(&mut store, &clock, "gains", false);
    abort_on(&store, "UPDATE");

    clock.advance(Duration::from_secs(60));
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let err = repo.mark_deleted("gains").unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))), "{err}");
    let after = repo.open("gains").unwrap();
    assert_eq!(after, Some(before));
    assert_eq!(after.unwrap().expires, None);
}

#[test]
fn failed_restore_keeps_note_deleted_with_expiry() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let before = seed_note(&mut store, &clock, "gains", true);
    abort_on(&store, "UPDATE");

    clock.advance(Duration::from_secs(60));
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let err = repo.restore("gains").unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))), "{err}");
    let after = repo.open("gains").unwrap().unwrap();
    assert!(after.deleted);
    assert_eq!(after, before);
}

#[test]
fn failed_first_write_leaves_no_row() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    abort_on(&store, "INSERT");

    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    assert!(repo.write("gains", "hello").is_err());
    assert!(repo.open("gains").unwrap().is_none());
}

#[test]
fn service_seeds_new_notes_and_saves_on_demand() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let mut service = NoteService::new(repo);

    let opened = service.open_note("gains").unwrap();
    assert!(opened.is_new());
    assert_eq!(opened.content, "# gains\n\n");
    assert!(service.list_names(NoteFilter::All).unwrap().is_empty());

    service.save_note("gains", "# gains\n\nhello").unwrap();
    service.delete_note("gains").unwrap();
    let reopened = service.open_note("gains").unwrap();
    assert!(reopened.is_deleted());
    assert_eq!(reopened.content, "# gains\n\nhello");

    service.restore_note("gains").unwrap();
    assert_eq!(service.list_names(NoteFilter::Live).unwrap(), vec!["gains"]);
}

#[test]
fn service_maps_repository_errors() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let mut service = NoteService::new(repo);

    assert!(matches!(
        service.delete_note("ghost"),
        Err(NoteServiceError::NoteNotFound(_))
    ));
    service.save_note("gains", "hello").unwrap();
    assert!(matches!(
        service.purge_note("gains"),
        Err(NoteServiceError::NotDeleted(_))
    ));
}

#[test]
fn export_writes_markdown_file() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let mut service = NoteService::new(repo);
    service.save_note("plans/q3", "# plans\n\nship it").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = service.export_note("plans/q3", dir.path()).unwrap();
    assert_eq!(path, dir.path().join("plans_q3.md"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# plans\n\nship it");

    let missing_dir = dir.path().join("nope");
    assert!(matches!(
        service.export_note("plans/q3", &missing_dir),
        Err(NoteServiceError::InvalidExportDir(_))
    ));
    assert!(matches!(
        service.export_note("ghost", dir.path()),
        Err(NoteServiceError::NoteNotFound(_))
    ));
}

#[test]
fn note_view_serializes_for_json_output() {
    let clock = ManualClock::new(START_MS);
    let mut store = ready_store(&clock);
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), &clock, WEEK).unwrap();
    let note = repo.write("gains", "hello").unwrap();

    let value = serde_json::to_value(&note).unwrap();
    assert_eq!(value["name"], "gains");
    assert_eq!(value["deleted"], false);
    assert_eq!(value["date_modified"], START_MS);
    assert!(value["expires"].is_null());
}

fn seed_note(store: &mut Store, clock: &ManualClock, name: &str, deleted: bool) -> NoteView {
    let mut repo = SqliteNoteRepository::try_new(store.connection_mut(), clock, WEEK).unwrap();
    let written = repo.write(name, "hello").unwrap();
    if deleted {
        repo.mark_deleted(name).unwrap()
    } else {
        written
    }
}

fn abort_on(store: &Store, event: &str) {
    store
        .connection()
        .execute_batch(&format!(
            "CREATE TRIGGER abort_{event} BEFORE {event} ON notes
             BEGIN
                 SELECT RAISE(ABORT, 'simulated write failure');
             END;"
        ))
        .unwrap();
}
