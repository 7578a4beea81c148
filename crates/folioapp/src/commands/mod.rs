//! # Command Layer
//!
//! This module contains the **core business logic** of folio. Each operation lives in
//! its own submodule as plain async functions over the collaborator traits.
//!
//! ## Role and Responsibilities
//!
//! Commands are where the real work happens:
//! - Load the selected files and the roster snapshot
//! - Match, plan and build [`MutationJob`]s
//! - Hand the jobs to the [`Executor`] and record the undo entry
//! - Return a structured [`CmdResult`]
//!
//! ## What Commands Do NOT Do
//!
//! - **Any terminal I/O**: no stdout/stderr; messages are data
//! - **Argument parsing**: that's the CLI layer's job
//! - **Retries**: failed ids are reported, the caller decides
//!
//! ## Batch-fatal vs per-file
//!
//! A command returns `Err` only when nothing could be dispatched: the roster could
//! not be fetched, the remote is unreachable while loading the selection, or the input
//! is invalid. Everything that goes wrong for a single file (not found, permission,
//! no matching student) is data in the result.
//!
//! ## Testing Strategy
//!
//! **This is where the lion's share of testing lives.** Command tests run against
//! [`crate::remote::MemRemote`], [`crate::remote::MemRoster`] and
//! [`crate::ledger::MemKv`]; no I/O.
//!
//! ## Command Modules
//!
//! - [`rename`]: Match files to students and rename them
//! - [`relocate`]: Move files into student folders or a chosen folder
//! - [`trash`]: Trash and restore files
//! - [`tagging`]: Set app properties, year tags
//! - [`undo`]: Replay a ledger entry
//! - [`tasks`]: List, show and prune ledger entries
//! - [`csv_io`]: CSV export/import of rename and move plans, roster CSV
//! - [`listing`]: Paginated folder listing
//! - [`selection`]: Checked-file state over a listing
//! - [`helpers`]: Preloading and the shared dispatch path

use crate::config::FolioConfig;
use crate::executor::{CancelToken, Executor};
use crate::ledger::{KvStore, Ledger, PruneReport};
use crate::model::{BatchResult, RemoteFile, UndoEntry};
use crate::remote::RemoteStore;
use serde::Serialize;
use std::sync::Arc;

pub mod csv_io;
pub mod helpers;
pub mod listing;
pub mod relocate;
pub mod rename;
pub mod selection;
pub mod tagging;
pub mod tasks;
pub mod trash;
pub mod undo;

pub use rename::RenamePlan;

/// Everything a batch command needs besides its own arguments.
pub struct Session<'a, R: RemoteStore + ?Sized, K: KvStore> {
    pub remote: &'a Arc<R>,
    pub ledger: &'a Ledger<K>,
    pub config: &'a FolioConfig,
    pub cancel: CancelToken,
}

impl<'a, R: RemoteStore + ?Sized + 'static, K: KvStore> Session<'a, R, K> {
    pub fn new(remote: &'a Arc<R>, ledger: &'a Ledger<K>, config: &'a FolioConfig) -> Self {
        Self {
            remote,
            ledger,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn executor(&self) -> Executor<R> {
        Executor::new(Arc::clone(self.remote))
            .with_max_concurrent_chunks(self.config.max_concurrent_chunks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// A selected file that was deliberately left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub file_id: String,
    pub name: String,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(file: &RemoteFile, reason: impl Into<String>) -> Self {
        Self {
            file_id: file.id.clone(),
            name: file.name.clone(),
            reason: reason.into(),
        }
    }
}

/// The result of a command execution.
#[derive(Debug, Default)]
pub struct CmdResult {
    /// Outcome of the executed batch, when one ran.
    pub batch: Option<BatchResult>,
    /// Ledger key under which the batch can be undone.
    pub task_key: Option<String>,
    pub skipped: Vec<SkippedFile>,
    pub messages: Vec<CmdMessage>,
    /// Planned renames (preview).
    pub plan: Vec<RenamePlan>,
    /// Files returned by a listing.
    pub listed_files: Vec<RemoteFile>,
    /// Ledger entries (tasks, show).
    pub tasks: Vec<UndoEntry>,
    pub prune: Option<PruneReport>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.add_message(message);
        self
    }
}
