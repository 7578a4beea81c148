use super::helpers::{dispatch, preload};
use super::{CmdResult, Session, SkippedFile};
use crate::error::Result;
use crate::ledger::KvStore;
use crate::model::{Mutation, MutationJob, PriorState, TaskKind};
use crate::remote::RemoteStore;

async fn set_trashed<R, K, I>(session: &Session<'_, R, K>, ids: &[I], trashed: bool) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    let loaded = preload(session.remote.as_ref(), ids).await?;
    let mutation = if trashed { Mutation::Trash } else { Mutation::Untrash };

    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for file in &loaded.files {
        if file.trashed == trashed {
            let reason = if trashed { "already in trash" } else { "not in trash" };
            skipped.push(SkippedFile::new(file, reason));
            continue;
        }
        let job = MutationJob::new(file.id.clone(), mutation.clone());
        let prior = PriorState::capture(file, &job.mutation);
        planned.push((job, prior));
    }

    let (kind, verb) = if trashed {
        (TaskKind::Trash, "Trashed")
    } else {
        (TaskKind::Untrash, "Restored")
    };
    let mut result = dispatch(session, kind, planned, loaded.missing, verb).await?;
    result.skipped = skipped;
    Ok(result)
}

pub async fn trash_files<R, K, I>(session: &Session<'_, R, K>, ids: &[I]) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    set_trashed(session, ids, true).await
}

pub async fn untrash_files<R, K, I>(session: &Session<'_, R, K>, ids: &[I]) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
    I: AsRef<str>,
{
    set_trashed(session, ids, false).await
}
