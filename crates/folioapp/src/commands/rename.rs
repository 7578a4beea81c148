//! Match selected files to students and rename them.
//!
//! - `preview`: plan only, nothing is sent
//! - `run`: plan, execute, record the former names for undo

use super::helpers::{dispatch, preload};
use super::{CmdMessage, CmdResult, Session, SkippedFile};
use crate::config::FolioConfig;
use crate::error::Result;
use crate::ledger::KvStore;
use crate::matcher::{match_file, synthesize_name, MatchOptions, NamingOptions};
use crate::model::{JobFailure, MutationJob, PriorState, RemoteFile, StudentRecord, TaskKind};
use crate::remote::{RemoteStore, RosterFilter, RosterSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One planned rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePlan {
    pub file_id: String,
    pub former_name: String,
    pub name: String,
    pub student_id: u32,
}

#[derive(Debug, Default)]
struct Planned {
    rows: Vec<(RenamePlan, RemoteFile)>,
    skipped: Vec<SkippedFile>,
    missing: Vec<JobFailure>,
}

/// The roster filter's grade enables homeroom-code matching unless the caller set one.
pub(crate) fn effective_options(
    filter: &RosterFilter,
    options: &MatchOptions,
    config: &FolioConfig,
) -> MatchOptions {
    MatchOptions {
        grade: options.grade.or(filter.grade),
        email_domain: options
            .email_domain
            .clone()
            .or_else(|| config.email_domain.clone()),
    }
}

/// Plans renames for already loaded files against a roster snapshot.
pub fn plan_files(
    files: &[RemoteFile],
    roster: &[StudentRecord],
    options: &MatchOptions,
    naming: &NamingOptions,
) -> (Vec<RenamePlan>, Vec<SkippedFile>) {
    let mut plan = Vec::new();
    let mut skipped = Vec::new();
    for file in files {
        let candidate = match_file(file, roster, options);
        let (Some(student), Some(name)) = (
            candidate.student.as_ref(),
            synthesize_name(&candidate, naming),
        ) else {
            debug!(file_id = %file.id, reason = %candidate.reason, "no student matched");
            skipped.push(SkippedFile::new(file, format!("no matching student ({})", candidate.reason)));
            continue;
        };
        if name == file.name {
            skipped.push(SkippedFile::new(file, "already named"));
            continue;
        }
        plan.push(RenamePlan {
            file_id: file.id.clone(),
            former_name: file.name.clone(),
            name,
            student_id: student.id,
        });
    }
    (plan, skipped)
}

async fn plan<R, K, I>(
    session: &Session<'_, R, K>,
    roster: &dyn RosterSource,
    ids: &[I],
    filter: &RosterFilter,
    options: &MatchOptions,
    naming: &NamingOptions,
) -> Result<Planned>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let students = roster.list_students(filter).await?;
    let loaded = preload(session.remote.as_ref(), ids).await?;
    let options = effective_options(filter, options, session.config);

    let (rows, skipped) = plan_files(&loaded.files, &students, &options, naming);
    let rows = rows
        .into_iter()
        .filter_map(|row| {
            let file = loaded.files.iter().find(|f| f.id == row.file_id)?.clone();
            Some((row, file))
        })
        .collect();
    Ok(Planned {
        rows,
        skipped,
        missing: loaded.missing,
    })
}

pub async fn preview<R, K, I>(
    session: &Session<'_, R, K>,
    roster: &dyn RosterSource,
    ids: &[I],
    filter: &RosterFilter,
    options: &MatchOptions,
    naming: &NamingOptions,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let planned = plan(session, roster, ids, filter, options, naming).await?;
    let mut result = CmdResult {
        plan: planned.rows.into_iter().map(|(row, _)| row).collect(),
        skipped: planned.skipped,
        ..Default::default()
    };
    for missing in &planned.missing {
        result.add_message(CmdMessage::warning(format!(
            "{}: {}",
            missing.file_id, missing.kind
        )));
    }
    result.add_message(CmdMessage::info(format!(
        "{} file(s) would be renamed, {} skipped",
        result.plan.len(),
        result.skipped.len()
    )));
    Ok(result)
}

pub async fn run<R, K, I>(
    session: &Session<'_, R, K>,
    roster: &dyn RosterSource,
    ids: &[I],
    filter: &RosterFilter,
    options: &MatchOptions,
    naming: &NamingOptions,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let planned = plan(session, roster, ids, filter, options, naming).await?;
    let jobs = planned
        .rows
        .into_iter()
        .map(|(row, file)| {
            let job = MutationJob::rename(row.file_id, row.name);
            let prior = PriorState::capture(&file, &job.mutation);
            (job, prior)
        })
        .collect();

    let mut result = dispatch(session, TaskKind::Rename, jobs, planned.missing, "Renamed").await?;
    if !planned.skipped.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "{} file(s) skipped",
            planned.skipped.len()
        )));
    }
    result.skipped = planned.skipped;
    Ok(result)
}
