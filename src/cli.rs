use crate::types::{Coordinates, WorkoutId};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "geolog.sqlite3";

#[derive(Parser, Debug)]
#[command(
    name = "geolog",
    about = "Log running and cycling workouts pinned to map coordinates"
)]
pub struct Cli {
    /// SQLite database holding the saved workouts.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH, global = true)]
    pub db: PathBuf,

    /// Current position as LAT,LNG. Without it, map features stay disabled.
    #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true, global = true)]
    pub position: Option<Coordinates>,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// List saved workouts, oldest first (default).
    List,

    /// Log a new workout.
    Add {
        #[command(subcommand)]
        workout: AddCmd,
    },

    /// Delete one workout.
    Delete { id: WorkoutId },

    /// Center the map on one workout.
    Show { id: WorkoutId },

    /// Delete every saved workout.
    Reset {
        /// Confirm that all workouts should be deleted.
        #[arg(long)]
        yes: bool,
    },

    /// Write all workouts as GPX waypoints.
    ExportGpx {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum AddCmd {
    Running {
        #[command(flatten)]
        common: AddArgs,

        /// Steps per minute.
        #[arg(long)]
        cadence: f64,
    },
    Cycling {
        #[command(flatten)]
        common: AddArgs,

        /// Elevation gain in metres; may be negative.
        #[arg(long, allow_hyphen_values = true)]
        elevation: f64,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Distance in kilometres.
    #[arg(long)]
    pub distance: f64,

    /// Duration in minutes.
    #[arg(long)]
    pub duration: f64,

    /// Where the workout happened as LAT,LNG. Defaults to --position.
    #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
    pub at: Option<Coordinates>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_cycling_with_negative_values() {
        let cli = Cli::try_parse_from([
            "geolog",
            "--position",
            "38.7,-9.1",
            "add",
            "cycling",
            "--distance",
            "20",
            "--duration",
            "60",
            "--elevation",
            "-15",
        ])
        .unwrap();
        assert_eq!(cli.position, Some(Coordinates::new(38.7, -9.1)));
        let Some(Cmd::Add {
            workout: AddCmd::Cycling { common, elevation },
        }) = cli.cmd
        else {
            panic!("expected add cycling");
        };
        assert_eq!(elevation, -15.0);
        assert_eq!(common.distance, 20.0);
        assert!(common.at.is_none());
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["geolog"]).unwrap();
        assert_eq!(cli.db, PathBuf::from(DEFAULT_DB_PATH));
        assert!(cli.cmd.is_none());
    }

    #[test]
    fn test_no_location_timeout_flag() {
        // The terminal resolves --position synchronously; there is nothing to wait for.
        assert!(Cli::try_parse_from(["geolog", "--location-timeout", "5"]).is_err());
    }
}
