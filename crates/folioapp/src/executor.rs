//! # Batch Mutation Executor
//!
//! Applies a list of [`MutationJob`]s to the remote store.
//!
//! ## Scheduling
//!
//! Jobs are split into contiguous chunks of `chunk_size` (default
//! [`DEFAULT_CHUNK_SIZE`]). Every chunk runs as its own tokio task, so chunks proceed
//! concurrently; inside a chunk jobs run strictly in input order with one
//! outstanding remote call at a time. The number of in-flight calls is therefore
//! bounded by the number of chunks, and optionally further by
//! [`Executor::with_max_concurrent_chunks`], which puts a semaphore in front of the
//! chunk tasks. Across chunks there is no ordering guarantee.
//!
//! ## Failure policy
//!
//! No single job ever aborts its chunk or the batch:
//!
//! - a job with a missing or empty required field is a `Validation` failure and is
//!   never sent;
//! - a remote error is classified by [`crate::error::RemoteError::kind`] and recorded;
//! - after [`CancelToken::cancel`], jobs not yet started are recorded as `Cancelled`;
//! - a chunk task that panics records every job of the chunk as `Transient`.
//!
//! Every chunk therefore reports exactly one outcome per job. There is no retry;
//! callers that want one resubmit the failed ids.

use crate::error::{FolioError, Result};
use crate::model::{BatchResult, ChunkResult, FailureKind, JobFailure, Mutation, MutationJob};
use crate::remote::{FilePatch, RemoteStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 7;

/// Cooperative cancellation, checked between per-file calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Splits `jobs` into contiguous chunks of at most `chunk_size`.
pub fn chunk_jobs(jobs: Vec<MutationJob>, chunk_size: usize) -> Vec<Vec<MutationJob>> {
    let size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(jobs.len().div_ceil(size));
    let mut iter = jobs.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Translates a job into the patch sent to the remote store.
///
/// Returns the validation message when a required field is missing.
pub fn build_patch(job: &MutationJob) -> std::result::Result<FilePatch, String> {
    if job.file_id.trim().is_empty() {
        return Err("missing file id".to_string());
    }
    let mut patch = FilePatch::default();
    match &job.mutation {
        Mutation::Rename { name } => {
            let name = non_empty(name).ok_or("missing new name")?;
            patch.name = Some(name.to_string());
        }
        Mutation::Move { from, to } => {
            let to = non_empty(to).ok_or("missing destination folder")?;
            patch.add_parents.push(to.to_string());
            if let Some(from) = non_empty(from) {
                if from != to {
                    patch.remove_parents.push(from.to_string());
                }
            }
        }
        Mutation::Trash => patch.trashed = Some(true),
        Mutation::Untrash => patch.trashed = Some(false),
        Mutation::SetProperties { properties } => {
            if properties.is_empty() {
                return Err("no properties to set".to_string());
            }
            if properties.keys().any(|k| k.trim().is_empty()) {
                return Err("empty property key".to_string());
            }
            patch.app_properties = properties.clone();
        }
    }
    Ok(patch)
}

pub struct Executor<R: RemoteStore + ?Sized> {
    remote: Arc<R>,
    max_concurrent_chunks: Option<usize>,
}

impl<R: RemoteStore + ?Sized + 'static> Executor<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self {
            remote,
            max_concurrent_chunks: None,
        }
    }

    /// Caps how many chunks run at once. `None` runs every chunk at once.
    pub fn with_max_concurrent_chunks(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_chunks = limit.filter(|n| *n > 0);
        self
    }

    pub async fn execute(&self, jobs: Vec<MutationJob>, chunk_size: usize) -> Result<BatchResult> {
        self.execute_with_cancel(jobs, chunk_size, &CancelToken::new())
            .await
    }

    pub async fn execute_with_cancel(
        &self,
        jobs: Vec<MutationJob>,
        chunk_size: usize,
        cancel: &CancelToken,
    ) -> Result<BatchResult> {
        if chunk_size == 0 {
            return Err(FolioError::Api("chunk size must be at least 1".to_string()));
        }

        let total = jobs.len();
        let chunks = chunk_jobs(jobs, chunk_size);
        info!(total, chunks = chunks.len(), chunk_size, "executing batch");

        let semaphore = self
            .max_concurrent_chunks
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut handles = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let ids: Vec<String> = chunk.iter().map(|j| j.file_id.clone()).collect();
            let remote = Arc::clone(&self.remote);
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();
            let handle = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                run_chunk(remote.as_ref(), index, chunk, &cancel).await
            });
            handles.push((index, ids, handle));
        }

        let mut result = BatchResult {
            total_requested: total,
            ..Default::default()
        };
        for (index, ids, handle) in handles {
            match handle.await {
                Ok(chunk) => result.absorb(chunk),
                Err(join_err) => {
                    warn!(chunk = index, error = %join_err, "chunk task did not complete");
                    let mut chunk = ChunkResult::new(index);
                    chunk.failed = ids
                        .into_iter()
                        .map(|id| {
                            JobFailure::new(id, FailureKind::Transient, join_err.to_string())
                        })
                        .collect();
                    result.absorb(chunk);
                }
            }
        }

        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "batch finished"
        );
        Ok(result)
    }
}

async fn run_chunk<R: RemoteStore + ?Sized>(
    remote: &R,
    index: usize,
    jobs: Vec<MutationJob>,
    cancel: &CancelToken,
) -> ChunkResult {
    let mut result = ChunkResult::new(index);

    for job in jobs {
        if cancel.is_cancelled() {
            result.failed.push(JobFailure::new(
                job.file_id,
                FailureKind::Cancelled,
                "batch cancelled before this file was processed",
            ));
            continue;
        }

        let patch = match build_patch(&job) {
            Ok(patch) => patch,
            Err(message) => {
                warn!(chunk = index, file_id = %job.file_id, %message, "invalid job");
                result
                    .failed
                    .push(JobFailure::new(job.file_id, FailureKind::Validation, message));
                continue;
            }
        };

        match remote.update(&job.file_id, &patch).await {
            Ok(file) => result.succeeded.push(file),
            Err(err) => {
                let kind = err.kind();
                warn!(chunk = index, file_id = %job.file_id, %kind, error = %err, "job failed");
                result
                    .failed
                    .push(JobFailure::new(job.file_id, kind, err.to_string()));
            }
        }
    }

    debug!(
        chunk = index,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "chunk finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::model::RemoteFile;
    use crate::remote::MemRemote;
    use std::collections::BTreeMap;

    fn remote_with(n: usize) -> Arc<MemRemote> {
        Arc::new(MemRemote::with_files((1..=n).map(|i| {
            RemoteFile::new(format!("job{}", i), format!("old{}.pdf", i)).with_parent("p1")
        })))
    }

    fn rename_jobs(n: usize) -> Vec<MutationJob> {
        (1..=n)
            .map(|i| MutationJob::rename(format!("job{}", i), format!("new{}.pdf", i)))
            .collect()
    }

    #[test]
    fn chunk_count_is_ceiling() {
        for (len, size) in [(0, 7), (1, 7), (7, 7), (8, 7), (22, 7), (22, 1), (5, 10)] {
            let chunks = chunk_jobs(rename_jobs(len), size);
            assert_eq!(chunks.len(), len.div_ceil(size), "len={} size={}", len, size);
            assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), len);
        }
    }

    #[test]
    fn chunks_are_contiguous() {
        let sizes: Vec<usize> = chunk_jobs(rename_jobs(22), 7).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![7, 7, 7, 1]);
        let chunks = chunk_jobs(rename_jobs(22), 7);
        assert_eq!(chunks[1][0].file_id, "job8");
        assert_eq!(chunks[3][0].file_id, "job22");
    }

    #[test]
    fn patch_validation() {
        assert!(build_patch(&MutationJob::new("a", Mutation::Rename { name: None })).is_err());
        assert!(build_patch(&MutationJob::new(
            "a",
            Mutation::Rename {
                name: Some("  ".into())
            }
        ))
        .is_err());
        assert!(build_patch(&MutationJob::new(
            "a",
            Mutation::Move {
                from: Some("p1".into()),
                to: None
            }
        ))
        .is_err());
        assert!(build_patch(&MutationJob::new(
            "a",
            Mutation::SetProperties {
                properties: BTreeMap::new()
            }
        ))
        .is_err());
        assert!(build_patch(&MutationJob::rename("", "x.pdf")).is_err());
    }

    #[test]
    fn move_patch_swaps_parents() {
        let patch = build_patch(&MutationJob::move_to("a", Some("p1".into()), "p2")).unwrap();
        assert_eq!(patch.add_parents, vec!["p2"]);
        assert_eq!(patch.remove_parents, vec!["p1"]);

        let same = build_patch(&MutationJob::move_to("a", Some("p2".into()), "p2")).unwrap();
        assert!(same.remove_parents.is_empty());
    }

    #[tokio::test]
    async fn one_permission_failure_does_not_abort_the_batch() {
        let remote = remote_with(22);
        remote.fail_updates_of("job15", RemoteError::forbidden("job15"));
        let executor = Executor::new(remote.clone());

        let result = executor.execute(rename_jobs(22), 7).await.unwrap();

        assert_eq!(result.chunk_count, 4);
        assert_eq!(result.total_requested, 22);
        assert_eq!(result.succeeded.len(), 21);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].file_id, "job15");
        assert_eq!(result.failed[0].kind, FailureKind::Permission);
        assert_eq!(remote.snapshot("job16").unwrap().name, "new16.pdf");
        assert_eq!(remote.snapshot("job15").unwrap().name, "old15.pdf");
    }

    #[tokio::test]
    async fn validation_failures_are_recorded_and_skipped() {
        let remote = remote_with(3);
        let executor = Executor::new(remote.clone());
        let jobs = vec![
            MutationJob::rename("job1", "a.pdf"),
            MutationJob::new("job2", Mutation::Rename { name: None }),
            MutationJob::rename("job3", "c.pdf"),
        ];

        let result = executor.execute(jobs, 7).await.unwrap();

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed[0].kind, FailureKind::Validation);
        assert!(!remote.update_log().contains(&"job2".to_string()));
    }

    #[tokio::test]
    async fn missing_files_are_not_found_failures() {
        let remote = remote_with(2);
        remote.remove("job2");
        let result = Executor::new(remote)
            .execute(rename_jobs(2), 7)
            .await
            .unwrap();
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn transient_errors_are_classified() {
        let remote = remote_with(2);
        remote.fail_updates_of("job1", RemoteError::new(503, "backend error"));
        let result = Executor::new(remote)
            .execute(rename_jobs(2), 1)
            .await
            .unwrap();
        assert_eq!(result.failed[0].kind, FailureKind::Transient);
        assert_eq!(result.succeeded.len(), 1);
    }

    #[tokio::test]
    async fn jobs_within_a_chunk_run_in_input_order() {
        let remote = remote_with(22);
        Executor::new(remote.clone())
            .execute(rename_jobs(22), 7)
            .await
            .unwrap();

        let log = remote.update_log();
        assert_eq!(log.len(), 22);
        for chunk in chunk_jobs(rename_jobs(22), 7) {
            let expected: Vec<String> = chunk.into_iter().map(|j| j.file_id).collect();
            let seen: Vec<String> = log
                .iter()
                .filter(|id| expected.contains(id))
                .cloned()
                .collect();
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test]
    async fn in_flight_calls_are_bounded_by_chunk_count() {
        let remote = remote_with(22);
        Executor::new(remote.clone())
            .execute(rename_jobs(22), 7)
            .await
            .unwrap();
        let peak = remote.peak_in_flight();
        assert!(peak > 1, "chunks ran one at a time (peak {})", peak);
        assert!(peak <= 4);
    }

    #[tokio::test]
    async fn semaphore_caps_running_chunks() {
        let remote = remote_with(20);
        Executor::new(remote.clone())
            .with_max_concurrent_chunks(Some(1))
            .execute(rename_jobs(20), 2)
            .await
            .unwrap();
        assert_eq!(remote.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn cancelled_batch_accounts_for_every_job() {
        let remote = remote_with(10);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Executor::new(remote.clone())
            .execute_with_cancel(rename_jobs(10), 3, &cancel)
            .await
            .unwrap();

        assert_eq!(result.succeeded.len(), 0);
        assert_eq!(result.failed.len(), 10);
        assert!(result
            .failed
            .iter()
            .all(|f| f.kind == FailureKind::Cancelled));
        assert!(remote.update_log().is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let err = Executor::new(remote_with(1))
            .execute(rename_jobs(1), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chunk size"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let result = Executor::new(remote_with(0))
            .execute(Vec::new(), 7)
            .await
            .unwrap();
        assert_eq!(result, BatchResult::default());
    }
}
