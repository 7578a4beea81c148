//! # Folio CLI Architecture
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this file only
//! invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/folioapp/`: the UI-agnostic engine (matcher, executor, ledger)
//! - `crates/folio/`: this operator tool, depends on `folioapp`
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/folio/src/cli/)                          │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Logging, config and ledger wiring (commands.rs)          │
//! │  - Terminal rendering (render.rs, styles.rs)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  folioapp commands / ledger                                 │
//! │  - Return structured `CmdResult` values                     │
//! │  - No knowledge of stdout/stderr or process exits           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The CLI works offline: it previews renames against a roster CSV and inspects,
//! exports and prunes the file-backed undo ledger. Batches against the remote drive
//! run through the library API from the hosting application.
//!
//! ## Testing Approach
//!
//! - **Argument parsing**: `try_parse_from` tests in `setup.rs`.
//! - **Rendering**: canned `CmdResult` values rendered to strings in `render.rs`.
//! - **End to end**: `tests/` drives the built binary with `assert_cmd`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
