//! # Folio Architecture
//!
//! Folio is a **UI-agnostic batch mutation engine** for student files kept in a remote
//! drive. It matches arbitrary file names to roster records, applies renames, moves,
//! property tags and trash flags to whole selections against a slow, quota-limited
//! remote API, and keeps enough "before" state to reverse the last batches.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade, owns remote, roster, ledger and config      │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Preload selection, match, plan jobs, record undo         │
//! │  - No terminal I/O                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine                                                     │
//! │  - segments.rs: file name -> segments + extension           │
//! │  - matcher/: strategy cascade + name synthesis              │
//! │  - executor.rs: chunked, concurrent, partially failing      │
//! │  - ledger/: time-boxed, size-bounded undo entries           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collaborators (remote.rs, ledger/backend.rs)               │
//! │  - RemoteStore, RosterSource, KvStore traits                │
//! │  - MemRemote, MemRoster, MemKv (testing), FsKv              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Model
//!
//! Per-file problems are data: every job ends up in `BatchResult::succeeded` or in
//! `BatchResult::failed` with a [`model::FailureKind`]. `Err` is reserved for the
//! batch-fatal cases (roster unavailable, remote unreachable, invalid input).
//!
//! ## Testing Strategy
//!
//! 1. **Commands** (`commands/*.rs`): thorough tests against the in-memory fakes.
//! 2. **Engine** modules: unit tests beside the code.
//! 3. **API** (`api.rs`): dispatch and end-to-end flows.
//! 4. `tests/`: public API and the file-backed ledger.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Business logic for each operation
//! - [`segments`]: Segment Extractor
//! - [`matcher`]: Student Matcher
//! - [`executor`]: Batch Mutation Executor
//! - [`ledger`]: Task/Undo Ledger
//! - [`remote`]: Remote collaborators and fakes
//! - [`model`]: Core data types
//! - [`config`]: Configuration
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod remote;
pub mod segments;

#[cfg(test)]
pub mod test_utils;
