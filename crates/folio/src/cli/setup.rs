use clap::{Parser, Subcommand, ValueEnum};
use folioapp::matcher::HomeroomPlacement;
use folioapp::model::{Grade, Homeroom};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    bin_name = "folio",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Preview student-file renames and manage the undo ledger", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to folio.toml in the OS config directory)
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Ledger directory (overrides ledger_dir from the config)
    #[arg(long, global = true, help_heading = "Options")]
    pub ledger_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Placement {
    Omit,
    Prefix,
    Embedded,
}

impl From<Placement> for HomeroomPlacement {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Omit => HomeroomPlacement::Omit,
            Placement::Prefix => HomeroomPlacement::Prefix,
            Placement::Embedded => HomeroomPlacement::Embedded,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match file names to students from a roster CSV (dry run)
    #[command(alias = "m", display_order = 1)]
    Match {
        /// Roster CSV: id,grade,homeroom,homeroomNumber,last,first,email,folderId
        #[arg(long, short = 'r')]
        roster: PathBuf,

        /// Restrict to one grade and enable homeroom-code matching (J1..H3 or 中1..高3)
        #[arg(long, short = 'g')]
        grade: Option<Grade>,

        /// Restrict to one homeroom (A..F)
        #[arg(long)]
        homeroom: Option<Homeroom>,

        /// Where the homeroom code goes in the new name
        #[arg(long, value_enum, default_value_t = Placement::Omit)]
        placement: Placement,

        /// Free text added after the student name
        #[arg(long, short = 'l')]
        label: Option<String>,

        /// Keep the unidentified parts of the original name
        #[arg(long)]
        keep_residual: bool,

        /// Domain student emails must belong to
        #[arg(long)]
        email_domain: Option<String>,

        /// File names to match
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },

    /// List recent undoable tasks
    #[command(alias = "ls", display_order = 2)]
    Tasks {
        /// How many tasks to show
        #[arg(long, short = 'n', default_value_t = 30)]
        max: usize,
    },

    /// Show the recorded state of one task
    #[command(display_order = 3)]
    Show {
        key: String,

        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a rename or move task as a CSV plan
    #[command(display_order = 4)]
    Export {
        key: String,

        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Remove expired and surplus tasks
    #[command(display_order = 5)]
    Prune,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_match_args() {
        let cli = parse(&[
            "folio",
            "match",
            "--roster",
            "roster.csv",
            "--grade",
            "中1",
            "--placement",
            "prefix",
            "--keep-residual",
            "D09.jpg",
            "b1234567_report.pdf",
        ]);
        match cli.command {
            Commands::Match {
                roster,
                grade,
                placement,
                keep_residual,
                names,
                ..
            } => {
                assert_eq!(roster, PathBuf::from("roster.csv"));
                assert_eq!(grade, Some(Grade::J1));
                assert_eq!(placement, Placement::Prefix);
                assert!(keep_residual);
                assert_eq!(names.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_match_requires_names_and_roster() {
        assert!(Cli::try_parse_from(["folio", "match", "--roster", "r.csv"]).is_err());
        assert!(Cli::try_parse_from(["folio", "match", "a.pdf"]).is_err());
    }

    #[test]
    fn test_bad_grade_rejected() {
        assert!(
            Cli::try_parse_from(["folio", "match", "-r", "r.csv", "-g", "小1", "a.pdf"]).is_err()
        );
    }

    #[test]
    fn test_tasks_default_max() {
        match parse(&["folio", "tasks"]).command {
            Commands::Tasks { max } => assert_eq!(max, 30),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["folio", "prune", "--ledger-dir", "/tmp/l", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.ledger_dir, Some(PathBuf::from("/tmp/l")));
        assert!(matches!(cli.command, Commands::Prune));
    }

    #[test]
    fn test_export_output() {
        match parse(&["folio", "export", "task-1-abcdef01", "-o", "plan.csv"]).command {
            Commands::Export { key, output } => {
                assert_eq!(key, "task-1-abcdef01");
                assert_eq!(output, Some(PathBuf::from("plan.csv")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
