//! Moving files between folders.
//!
//! - `to_student_folders`: match each file and move it into its student's folder
//! - `move_files`: move every selected file into one destination
//!
//! A move detaches the file from its current primary parent and attaches the
//! destination; the primary parent is recorded so undo can move it back.

use super::helpers::{dispatch, preload};
use super::rename::effective_options;
use super::{CmdMessage, CmdResult, Session, SkippedFile};
use crate::error::{FolioError, Result};
use crate::ledger::KvStore;
use crate::matcher::{match_file, MatchOptions};
use crate::model::{FailureKind, JobFailure, MutationJob, PriorState, RemoteFile, TaskKind};
use crate::remote::{RemoteStore, RosterFilter, RosterSource};

fn move_job(file: &RemoteFile, destination: &str) -> (MutationJob, PriorState) {
    let job = MutationJob::move_to(
        file.id.clone(),
        file.primary_parent().map(str::to_string),
        destination,
    );
    let prior = PriorState::capture(file, &job.mutation);
    (job, prior)
}

pub async fn to_student_folders<R, K, I>(
    session: &Session<'_, R, K>,
    roster: &dyn RosterSource,
    ids: &[I],
    filter: &RosterFilter,
    options: &MatchOptions,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let students = roster.list_students(filter).await?;
    let loaded = preload(session.remote.as_ref(), ids).await?;
    let options = effective_options(filter, options, session.config);

    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    let mut preflight = loaded.missing;

    for file in &loaded.files {
        let candidate = match_file(file, &students, &options);
        let Some(student) = candidate.student else {
            skipped.push(SkippedFile::new(
                file,
                format!("no matching student ({})", candidate.reason),
            ));
            continue;
        };
        let Some(folder) = student.folder_id.as_deref().filter(|f| !f.is_empty()) else {
            let mut failure = JobFailure::new(
                file.id.clone(),
                FailureKind::Validation,
                format!("student {} has no folder", student.id),
            );
            failure.file_name = Some(file.name.clone());
            preflight.push(failure);
            continue;
        };
        if file.primary_parent() == Some(folder) {
            skipped.push(SkippedFile::new(file, "already in the student folder"));
            continue;
        }
        planned.push(move_job(file, folder));
    }

    let mut result = dispatch(session, TaskKind::Move, planned, preflight, "Moved").await?;
    if !skipped.is_empty() {
        result.add_message(CmdMessage::info(format!("{} file(s) skipped", skipped.len())));
    }
    result.skipped = skipped;
    Ok(result)
}

pub async fn move_files<R, K, I>(
    session: &Session<'_, R, K>,
    ids: &[I],
    destination: &str,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(FolioError::Api("No destination folder given".to_string()));
    }

    let loaded = preload(session.remote.as_ref(), ids).await?;
    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for file in &loaded.files {
        if file.primary_parent() == Some(destination) {
            skipped.push(SkippedFile::new(file, "already in the destination"));
        } else {
            planned.push(move_job(file, destination));
        }
    }

    let mut result = dispatch(session, TaskKind::Move, planned, loaded.missing, "Moved").await?;
    result.skipped = skipped;
    Ok(result)
}
