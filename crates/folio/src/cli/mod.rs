//! # CLI Behavior
//!
//! This is **one possible UI client** for folio, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and output
//! formatting.
//!
//! ## Commands
//!
//! - `folio match --roster roster.csv [--grade J1] <names...>`: show which student each
//!   file name resolves to and the name it would get. Nothing is renamed.
//! - `folio tasks [--max N]`: recent undoable tasks, newest first.
//! - `folio show <key> [--json]`: the recorded before-state of one task.
//! - `folio export <key> [--output file.csv]`: the task as a rename or move CSV plan.
//! - `folio prune`: drop expired, surplus and unreadable tasks.
//!
//! ## Logging
//!
//! Library logs go to stderr through `tracing-subscriber`. The filter comes from
//! `FOLIO_LOG` (e.g. `FOLIO_LOG=folioapp=debug`), defaulting to `warn`, or `debug`
//! with `-v`.
//!
//! ## Module Structure
//!
//! - `commands`: wiring and per-command handlers
//! - `render`: output formatting
//! - `setup`: argument parsing via clap
//! - `styles`: terminal styles

mod commands;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
