//! qwtd entry point.
//!
//! Loads configuration, initializes logging, brings the store up to date
//! (initialize or migrate, then sweep) and runs one note command.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, ListArgs};
use log::warn;
use qwtd_core::{
    default_config_path, default_log_dir, default_log_level, expiry_status, format_duration,
    init_logging, open_store, prepare_store, Clock, CoreConfig, NoteFilter, NoteService,
    SqliteNoteRepository, StartupReport, SystemClock, LATEST_GENERATION,
};
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("qwtd: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = CoreConfig::load_or_init(&config_path)?;

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Some(log_dir) = cli.log_dir.or_else(default_log_dir) {
        if let Err(err) = init_logging(level, &log_dir) {
            eprintln!("qwtd: logging disabled: {err}");
        }
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => config.db_path()?,
    };
    let retention = config.retention_window()?;

    let mut store = open_store(&db_path)
        .with_context(|| format!("cannot open store {}", db_path.display()))?;
    let report = prepare_store(&mut store, retention, SystemClock)?;
    if report.swept.is_none() {
        warn!("event=startup module=cli status=warn reason=sweep_failed");
    }

    let repo = SqliteNoteRepository::try_new(store.connection_mut(), SystemClock, retention)?;
    let mut service = NoteService::new(repo);
    let session = Session {
        db_path: &db_path,
        report,
        retention,
    };
    run_command(&mut service, &session, cli.command)?;
    drop(service);
    store.close()?;
    Ok(())
}

struct Session<'a> {
    db_path: &'a Path,
    report: StartupReport,
    retention: Duration,
}

fn run_command(
    service: &mut NoteService<SqliteNoteRepository<'_, SystemClock>>,
    session: &Session<'_>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Show { name } => {
            let opened = service.open_note(&name)?;
            if let Some(status) = opened
                .stored
                .as_ref()
                .and_then(|note| expiry_status(note, SystemClock.now_ms()))
            {
                eprintln!("{name}: {status}");
            }
            print!("{}", opened.content);
        }
        Command::Save { name, file } => {
            let content = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("cannot read stdin")?;
                    buffer
                }
            };
            service.save_note(&name, &content)?;
        }
        Command::Delete { name } => {
            let note = service.delete_note(&name)?;
            if let Some(status) = expiry_status(&note, SystemClock.now_ms()) {
                println!("{name}: {status}");
            }
        }
        Command::Restore { name } => {
            service.restore_note(&name)?;
            println!("{name}: restored");
        }
        Command::Purge { name } => {
            service.purge_note(&name)?;
            println!("{name}: permanently removed");
        }
        Command::List(args) => list(service, &args)?,
        Command::Export { name, dir } => {
            let path = service.export_note(&name, &dir)?;
            println!("{}", path.display());
        }
        Command::Status => print_status(session),
    }
    Ok(())
}

fn print_status(session: &Session<'_>) {
    let report = &session.report;
    println!("store: {}", session.db_path.display());
    println!(
        "generation: {} (latest {LATEST_GENERATION})",
        report.generation
    );
    println!("retention: {}", format_duration(session.retention));
    if report.initialized {
        println!("initialized new store");
    }
    if let Some(from) = report.migrated_from {
        println!("migrated from generation {from}");
    }
    match report.swept {
        Some(swept) => println!("swept {swept} expired note(s)"),
        None => println!("sweep failed; see log"),
    }
}

fn list(
    service: &NoteService<SqliteNoteRepository<'_, SystemClock>>,
    args: &ListArgs,
) -> Result<()> {
    let filter = if args.all {
        NoteFilter::All
    } else if args.deleted {
        NoteFilter::Deleted
    } else {
        NoteFilter::Live
    };

    if args.json {
        let notes = service.list_notes(filter)?;
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    let now_ms = SystemClock.now_ms();
    for note in service.list_notes(filter)? {
        match expiry_status(&note, now_ms) {
            Some(status) => println!("{}  ({status})", note.name),
            None => println!("{}", note.name),
        }
    }
    Ok(())
}
