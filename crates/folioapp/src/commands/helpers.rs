//! Shared plumbing for batch commands: loading the selection and the common
//! execute-annotate-record path.

use super::{CmdMessage, CmdResult, Session};
use crate::error::{FolioError, Result};
use crate::ledger::KvStore;
use crate::model::{BatchResult, FailureKind, JobFailure, MutationJob, PriorState, RemoteFile, TaskKind};
use crate::remote::RemoteStore;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// The selection after fetching every id once.
#[derive(Debug, Default)]
pub struct Preloaded {
    pub files: Vec<RemoteFile>,
    /// Ids that no longer exist or are not readable.
    pub missing: Vec<JobFailure>,
}

/// Trims, drops blanks and duplicates, keeps first-seen order.
pub fn normalize_ids<I: AsRef<str>>(ids: &[I]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Fetches the selected files.
///
/// `NotFound` and `Permission` become per-file failures; any other remote error means
/// the service is unusable and aborts the command.
pub async fn preload<R: RemoteStore + ?Sized, I: AsRef<str>>(
    remote: &R,
    ids: &[I],
) -> Result<Preloaded> {
    let ids = normalize_ids(ids);
    if ids.is_empty() {
        return Err(FolioError::Api("No files selected".to_string()));
    }

    let mut loaded = Preloaded::default();
    for id in ids {
        match remote.get(&id).await {
            Ok(file) => loaded.files.push(file),
            Err(err) => match err.kind() {
                kind @ (FailureKind::NotFound | FailureKind::Permission) => {
                    debug!(file_id = %id, %kind, "selected file not loadable");
                    loaded
                        .missing
                        .push(JobFailure::new(id, kind, err.to_string()));
                }
                _ => return Err(FolioError::Remote(err)),
            },
        }
    }
    Ok(loaded)
}

/// Fills in `file_name` for failures the executor could only report by id.
pub fn annotate_names(batch: &mut BatchResult, names: &HashMap<String, String>) {
    for failure in batch.failed.iter_mut() {
        if failure.file_name.is_none() {
            failure.file_name = names.get(&failure.file_id).cloned();
        }
    }
}

/// One warning per failed file.
pub fn failure_messages(batch: &BatchResult) -> Vec<CmdMessage> {
    batch
        .failed
        .iter()
        .map(|f| {
            let label = f.file_name.as_deref().unwrap_or(&f.file_id);
            CmdMessage::warning(format!("{}: {} ({})", label, f.kind, f.message))
        })
        .collect()
}

/// Executes the planned jobs, records the prior state of every file that changed and
/// summarizes the outcome.
///
/// `verb` is the past tense used in the summary ("Renamed", "Moved").
pub async fn dispatch<R, K>(
    session: &Session<'_, R, K>,
    kind: TaskKind,
    planned: Vec<(MutationJob, PriorState)>,
    preflight: Vec<JobFailure>,
    verb: &str,
) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
{
    let mut result = CmdResult::default();
    let names: HashMap<String, String> = planned
        .iter()
        .map(|(_, prior)| (prior.file_id.clone(), prior.name.clone()))
        .collect();

    if planned.is_empty() {
        let batch = BatchResult::default().with_preflight_failures(preflight);
        result.messages.extend(failure_messages(&batch));
        result.add_message(CmdMessage::info("No files needed changes"));
        result.batch = Some(batch);
        return Ok(result);
    }

    let (jobs, priors): (Vec<MutationJob>, Vec<PriorState>) = planned.into_iter().unzip();
    let mut batch = session
        .executor()
        .execute_with_cancel(jobs, session.config.chunk_size, &session.cancel)
        .await?
        .with_preflight_failures(preflight);
    annotate_names(&mut batch, &names);

    let changed: HashSet<&str> = batch.succeeded.iter().map(|f| f.id.as_str()).collect();
    let recorded: Vec<PriorState> = priors
        .into_iter()
        .filter(|p| changed.contains(p.file_id.as_str()))
        .collect();

    if !recorded.is_empty() {
        match session.ledger.record(kind, recorded) {
            Ok(key) => result.task_key = Some(key),
            Err(err) => {
                warn!(%kind, error = %err, "batch applied but undo entry not recorded");
                result.add_message(CmdMessage::warning(format!(
                    "Changes applied, but they cannot be undone: {}",
                    err
                )));
            }
        }
    }

    if !batch.succeeded.is_empty() {
        result.add_message(CmdMessage::success(format!(
            "{} {} file(s)",
            verb,
            batch.succeeded.len()
        )));
    }
    result.messages.extend(failure_messages(&batch));
    if let Some(key) = &result.task_key {
        result.add_message(CmdMessage::info(format!("Undo with task {}", key)));
    }
    result.batch = Some(batch);
    Ok(result)
}
