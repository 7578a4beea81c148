use super::render;
use super::setup::{Cli, Commands};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use folioapp::commands::{csv_io, rename, tasks, CmdResult, SkippedFile};
use folioapp::config::FolioConfig;
use folioapp::ledger::{FsKv, Ledger};
use folioapp::matcher::{MatchOptions, NamingOptions};
use folioapp::model::{Grade, Homeroom, RemoteFile};
use folioapp::remote::RosterFilter;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FOLIO_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = FolioConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.ledger_dir.clone() {
        config.ledger_dir = Some(dir);
    }
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Match {
            roster,
            grade,
            homeroom,
            placement,
            label,
            keep_residual,
            email_domain,
            names,
        } => {
            let options = MatchOptions {
                grade,
                email_domain: email_domain.or_else(|| config.email_domain.clone()),
            };
            let naming = NamingOptions {
                placement: placement.into(),
                label,
                keep_residual,
            };
            handle_match(&roster, grade, homeroom, &options, &naming, &names)
        }
        Commands::Tasks { max } => {
            let ledger = open_ledger(&config)?;
            let result = tasks::list(&ledger, max)?;
            print_out(&render::render_tasks(&result.tasks, Utc::now()))?;
            print_messages(&result)
        }
        Commands::Show { key, json } => {
            let ledger = open_ledger(&config)?;
            let result = tasks::show(&ledger, &key)?;
            for entry in &result.tasks {
                if json {
                    print_out(&format!("{}\n", serde_json::to_string_pretty(entry)?))?;
                } else {
                    print_out(&render::render_entry(entry, Utc::now()))?;
                }
            }
            Ok(())
        }
        Commands::Export { key, output } => {
            let ledger = open_ledger(&config)?;
            let result = tasks::show(&ledger, &key)?;
            let Some(entry) = result.tasks.first() else {
                return Ok(());
            };
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let written = csv_io::write_entry(file, entry)?;
                    eprintln!("Exported {} row(s) to {}", written, path.display());
                }
                None => {
                    csv_io::write_entry(io::stdout().lock(), entry)?;
                }
            }
            Ok(())
        }
        Commands::Prune => {
            let ledger = open_ledger(&config)?;
            let result = tasks::prune(&ledger)?;
            print_messages(&result)
        }
    }
}

/// Library logs go to stderr so stdout stays clean for CSV and JSON output.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose)
        .try_init();
}

fn open_ledger(config: &FolioConfig) -> Result<Ledger<FsKv>> {
    let dir: PathBuf = config
        .ledger_dir()
        .context("no ledger directory; set --ledger-dir or FOLIO_LEDGER_DIR")?;
    debug!(dir = %dir.display(), "opening ledger");
    Ok(Ledger::from_config(FsKv::new(dir), config)?)
}

/// Dry-run matching: the names stand in for the files of a selection.
fn handle_match(
    roster_path: &Path,
    grade: Option<Grade>,
    homeroom: Option<Homeroom>,
    options: &MatchOptions,
    naming: &NamingOptions,
    names: &[String],
) -> Result<()> {
    let file = File::open(roster_path)
        .with_context(|| format!("opening roster {}", roster_path.display()))?;
    let filter = RosterFilter { grade, homeroom };
    let roster: Vec<_> = csv_io::read_roster(file)?
        .into_iter()
        .filter(|s| filter.matches(s))
        .collect();
    debug!(students = roster.len(), "roster loaded");

    let files: Vec<RemoteFile> = names
        .iter()
        .enumerate()
        .map(|(i, name)| RemoteFile::new(format!("arg-{}", i + 1), name.clone()))
        .collect();
    let (plan, skipped) = rename::plan_files(&files, &roster, options, naming);
    print_out(&render::render_plan(&plan, &skipped))?;
    print_out(&summary(plan.len(), &skipped))
}

fn summary(planned: usize, skipped: &[SkippedFile]) -> String {
    format!(
        "\n{} file(s) would be renamed, {} skipped\n",
        planned,
        skipped.len()
    )
}

fn print_messages(result: &CmdResult) -> Result<()> {
    print_out(&render::render_messages(&result.messages))
}

fn print_out(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
