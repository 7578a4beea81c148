//! # CSV plans
//!
//! Rename and move batches can be exported to CSV, edited by hand, and applied
//! again. The column sets are fixed:
//!
//! | plan | columns |
//! |------|---------|
//! | rename | `id,formerName,name` |
//! | move | `id,parentId,lastFolderId,folderId` |
//!
//! Each move row describes one forward move to `folderId`. `parentId` and
//! `lastFolderId` record where the file was when the plan was written; they are
//! informational on import. Applying a row detaches the file's current primary
//! parent, so a stale plan never strands the file in two folders, and the undo
//! record holds that current parent.
//!
//! Applying rows goes through the executor like every other batch and is recorded
//! for undo.
//!
//! The roster can also be loaded from CSV (`id,grade,homeroom,homeroomNumber,last,
//! first,email,folderId`), which is how the CLI matches offline.

use super::helpers::{dispatch, preload};
use super::{CmdResult, RenamePlan, Session, SkippedFile};
use crate::error::{FolioError, Result};
use crate::ledger::KvStore;
use crate::model::{Mutation, MutationJob, PriorState, StudentRecord, TaskKind, UndoEntry};
use crate::remote::RemoteStore;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use tracing::debug;

pub const RENAME_COLUMNS: [&str; 3] = ["id", "formerName", "name"];
pub const MOVE_COLUMNS: [&str; 4] = ["id", "parentId", "lastFolderId", "folderId"];
pub const ROSTER_COLUMNS: [&str; 8] = [
    "id",
    "grade",
    "homeroom",
    "homeroomNumber",
    "last",
    "first",
    "email",
    "folderId",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRow {
    pub id: String,
    pub former_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub last_folder_id: Option<String>,
    pub folder_id: Option<String>,
}

/// Rows read back from a CSV plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedRows {
    Rename(Vec<RenameRow>),
    Move(Vec<MoveRow>),
}

impl ImportedRows {
    pub fn kind(&self) -> TaskKind {
        match self {
            ImportedRows::Rename(_) => TaskKind::Rename,
            ImportedRows::Move(_) => TaskKind::Move,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImportedRows::Rename(rows) => rows.len(),
            ImportedRows::Move(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The renames an applied entry performed.
pub fn export_rename_rows(entry: &UndoEntry) -> Vec<RenameRow> {
    entry
        .prior_state
        .iter()
        .filter_map(|p| {
            Some(RenameRow {
                id: p.file_id.clone(),
                former_name: p.name.clone(),
                name: p.applied_name.clone()?,
            })
        })
        .collect()
}

pub fn rename_rows_from_plan(plan: &[RenamePlan]) -> Vec<RenameRow> {
    plan.iter()
        .map(|p| RenameRow {
            id: p.file_id.clone(),
            former_name: p.former_name.clone(),
            name: p.name.clone(),
        })
        .collect()
}

/// The moves an applied entry performed.
pub fn export_move_rows(entry: &UndoEntry) -> Vec<MoveRow> {
    entry
        .prior_state
        .iter()
        .filter(|p| p.moved_to.is_some())
        .map(|p| MoveRow {
            id: p.file_id.clone(),
            parent_id: p.parent_id.clone(),
            last_folder_id: p.parent_id.clone(),
            folder_id: p.moved_to.clone(),
        })
        .collect()
}

/// Writes the header and `rows`; returns the number of data rows written.
fn write_rows<W: Write, T: Serialize>(writer: W, columns: &[&str], rows: &[T]) -> Result<usize> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(columns)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn write_rename_rows<W: Write>(writer: W, rows: &[RenameRow]) -> Result<usize> {
    write_rows(writer, &RENAME_COLUMNS, rows)
}

pub fn write_move_rows<W: Write>(writer: W, rows: &[MoveRow]) -> Result<usize> {
    write_rows(writer, &MOVE_COLUMNS, rows)
}

/// Writes the plan matching the entry's kind. Returns the number of rows written,
/// which can be lower than the number of recorded files.
pub fn write_entry<W: Write>(writer: W, entry: &UndoEntry) -> Result<usize> {
    match entry.kind {
        TaskKind::Rename => write_rename_rows(writer, &export_rename_rows(entry)),
        TaskKind::Move => write_move_rows(writer, &export_move_rows(entry)),
        other => Err(FolioError::Api(format!(
            "Only rename and move tasks can be exported, {} is {}",
            entry.key, other
        ))),
    }
}

fn read_rows<R: Read, T: DeserializeOwned>(reader: R, columns: &[&str]) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers != columns {
        return Err(FolioError::Api(format!(
            "Expected columns {}, found {}",
            columns.join(","),
            headers.join(",")
        )));
    }
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn read_rename_rows<R: Read>(reader: R) -> Result<Vec<RenameRow>> {
    read_rows(reader, &RENAME_COLUMNS)
}

pub fn read_move_rows<R: Read>(reader: R) -> Result<Vec<MoveRow>> {
    read_rows(reader, &MOVE_COLUMNS)
}

/// Reads either plan, telling them apart by header.
pub fn read_plan<R: Read>(mut reader: R) -> Result<ImportedRows> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let header = text.lines().next().unwrap_or_default();
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns == MOVE_COLUMNS {
        Ok(ImportedRows::Move(read_move_rows(text.as_bytes())?))
    } else {
        Ok(ImportedRows::Rename(read_rename_rows(text.as_bytes())?))
    }
}

pub fn read_roster<R: Read>(reader: R) -> Result<Vec<StudentRecord>> {
    read_rows(reader, &ROSTER_COLUMNS)
}

pub fn jobs_from_rename_rows(rows: &[RenameRow]) -> Vec<MutationJob> {
    rows.iter()
        .map(|row| {
            MutationJob::new(
                row.id.clone(),
                Mutation::Rename {
                    name: Some(row.name.clone()),
                },
            )
        })
        .collect()
}

pub fn jobs_from_move_rows(rows: &[MoveRow]) -> Vec<MutationJob> {
    rows.iter()
        .map(|row| {
            MutationJob::new(
                row.id.clone(),
                Mutation::Move {
                    from: row.parent_id.clone(),
                    to: row.folder_id.clone(),
                },
            )
        })
        .collect()
}

/// Executes an imported plan and records it for undo.
pub async fn apply_rows<R, K>(session: &Session<'_, R, K>, rows: &ImportedRows) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
{
    let jobs = match rows {
        ImportedRows::Rename(rows) => jobs_from_rename_rows(rows),
        ImportedRows::Move(rows) => jobs_from_move_rows(rows),
    };
    let ids: Vec<&str> = jobs.iter().map(|j| j.file_id.as_str()).collect();
    let loaded = preload(session.remote.as_ref(), &ids).await?;
    let files: HashMap<&str, _> = loaded.files.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut seen = HashSet::new();
    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for mut job in jobs {
        let Some(file) = files.get(job.file_id.as_str()) else {
            continue;
        };
        if !seen.insert(job.file_id.clone()) {
            skipped.push(SkippedFile::new(file, "duplicate row"));
            continue;
        }
        if let Mutation::Rename { name: Some(name) } = &job.mutation {
            if name == &file.name {
                skipped.push(SkippedFile::new(file, "already named"));
                continue;
            }
        }
        if let Mutation::Move { from, to } = &mut job.mutation {
            let current = file.primary_parent().map(str::to_string);
            if *from != current {
                debug!(
                    file_id = %file.id,
                    planned = ?from,
                    actual = ?current,
                    "move row parent is stale, using the file's current parent"
                );
                *from = current;
            }
            if to.is_some() && *to == *from {
                skipped.push(SkippedFile::new(file, "already in folder"));
                continue;
            }
        }
        let prior = PriorState::capture(file, &job.mutation);
        planned.push((job, prior));
    }

    let verb = match rows {
        ImportedRows::Rename(_) => "Renamed",
        ImportedRows::Move(_) => "Moved",
    };
    let mut result = dispatch(session, rows.kind(), planned, loaded.missing, verb).await?;
    result.skipped = skipped;
    Ok(result)
}
