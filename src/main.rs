#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use geolog::cli::{self, AddCmd, Cmd};
use geolog::session::{SessionConfig, SessionController};
use geolog::storage::SqliteBlobStore;
use geolog::terminal::{TerminalList, TerminalMap};
use geolog::types::{KindInput, WorkoutForm};
use geolog::{gpx, utils};

#[macro_use]
extern crate geolog;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let config = SessionConfig::default();
    let blobs = SqliteBlobStore::open(&cli.db)
        .with_context(|| format!("opening workout database: {}", cli.db.display()))?;
    let mut session =
        SessionController::new(config, blobs, TerminalMap::new(cli.position), TerminalList::new());

    // Both failures are logged by the session and leave it usable. An
    // unreadable blob has been copied aside before anything overwrites it.
    let restored = match session.start() {
        Ok(n) => n,
        Err(e) => {
            dlog!("restore_failed err={e} backup_key={}", session.config().backup_key());
            0
        }
    };
    let fix = session.map().locate();
    if let Err(e) = session.on_location_fix(fix) {
        dlog!("location_unavailable err={e}");
    }
    dlog!("mode={:?} restored={restored}", cli.cmd);

    match cli.cmd.unwrap_or(Cmd::List) {
        Cmd::List => {
            if session.workouts().is_empty() {
                println!("No workouts yet.");
            }
            for line in session.list().lines() {
                println!("{line}");
            }
        }
        Cmd::Add { workout } => {
            let (args, input) = match workout {
                AddCmd::Running { common, cadence } => {
                    (common, KindInput::Running { cadence_spm: cadence })
                }
                AddCmd::Cycling { common, elevation } => (
                    common,
                    KindInput::Cycling {
                        elevation_gain_m: elevation,
                    },
                ),
            };
            let at = args
                .at
                .or(cli.position)
                .context("No position for the workout: pass --at or --position.")?;

            session.on_map_click(at)?;
            session.list_mut().fill_form(WorkoutForm {
                distance_km: args.distance,
                duration_min: args.duration,
                input,
            });
            let added = session.on_form_submit()?;
            added.persisted.context("saving workouts")?;

            if let Some(line) = session.list().line(added.value) {
                println!("{line}");
            }
        }
        Cmd::Delete { id } => {
            let deleted = session.delete_workout(id)?;
            deleted.persisted.context("saving workouts")?;
            println!("deleted {id}\t{}", deleted.value.description());
        }
        Cmd::Show { id } => {
            let at = session.select_workout(id)?;
            println!("{id}\t{at}");
        }
        Cmd::Reset { yes } => {
            if !yes {
                bail!("Refusing to delete all workouts without --yes.");
            }
            let n = session.workouts().len();
            session.reset_all().context("clearing saved workouts")?;
            println!("deleted {n} workouts");
        }
        Cmd::ExportGpx { path } => {
            let n = gpx::export_gpx(&path, session.workouts())?;
            println!("wrote {n} workouts to {}", path.display());
        }
    }

    Ok(())
}
