//! Replaying a ledger entry.
//!
//! The entry's inverse jobs go through the same executor as any batch, so undo has
//! the same partial-failure contract. Files that were restored leave the entry;
//! files whose inverse job failed stay in it, under the same key and age, for
//! another attempt until it expires. An entry with nothing left is removed. An undo
//! is not itself recorded.

use super::helpers::{annotate_names, failure_messages};
use super::{CmdMessage, CmdResult, Session};
use crate::error::{FolioError, Result};
use crate::ledger::KvStore;
use crate::model::BatchResult;
use crate::remote::RemoteStore;
use std::collections::{HashMap, HashSet};
use tracing::info;

pub async fn run<R, K>(session: &Session<'_, R, K>, key: &str) -> Result<CmdResult>
where
    R: RemoteStore + ?Sized + 'static,
    K: KvStore,
{
    let Some(entry) = session.ledger.lookup(key)? else {
        return Err(FolioError::Api(format!(
            "Task {} not found or expired",
            key
        )));
    };

    let mut result = CmdResult {
        task_key: Some(entry.key.clone()),
        ..Default::default()
    };

    let jobs = entry.inverse_jobs();
    if jobs.is_empty() {
        session.ledger.remove(&entry.key)?;
        result.batch = Some(BatchResult::default());
        result.add_message(CmdMessage::info("Nothing to undo"));
        return Ok(result);
    }

    info!(key = %entry.key, kind = %entry.kind, jobs = jobs.len(), "replaying task");
    let mut batch = session
        .executor()
        .execute_with_cancel(jobs, session.config.chunk_size, &session.cancel)
        .await?;

    // Report failures under the name the file had when the entry was written.
    let names: HashMap<String, String> = entry
        .prior_state
        .iter()
        .map(|p| {
            let current = p.applied_name.clone().unwrap_or_else(|| p.name.clone());
            (p.file_id.clone(), current)
        })
        .collect();
    annotate_names(&mut batch, &names);

    if batch.all_failed() {
        result.add_message(CmdMessage::error(format!(
            "Undo of task {} failed; it can be retried",
            entry.key
        )));
    } else {
        let failed: HashSet<&str> = batch.failed.iter().map(|f| f.file_id.as_str()).collect();
        let kept = session.ledger.retain_files(&entry.key, &failed)?;
        result.add_message(CmdMessage::success(format!(
            "Reverted {} {} change(s)",
            batch.succeeded.len(),
            entry.kind
        )));
        if kept {
            result.add_message(CmdMessage::warning(format!(
                "{} file(s) not reverted; undo task {} again to retry them",
                failed.len(),
                entry.key
            )));
        }
    }
    result.messages.extend(failure_messages(&batch));
    result.batch = Some(batch);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{relocate, tagging, trash};
    use crate::error::RemoteError;
    use crate::model::{FailureKind, RemoteFile};
    use crate::test_utils::TestEnv;

    #[tokio::test]
    async fn test_undo_move_restores_primary_parent() {
        let env = TestEnv::new([RemoteFile::new("f1", "a.pdf").with_parent("P1")]);
        let moved = relocate::move_files(&env.session(), &["f1"], "P2")
            .await
            .unwrap();
        assert_eq!(env.file("f1").parent_ids, vec!["P2"]);

        let key = moved.task_key.unwrap();
        let result = run(&env.session(), &key).await.unwrap();
        assert!(result.batch.unwrap().all_succeeded());
        assert_eq!(env.file("f1").parent_ids, vec!["P1"]);
        assert!(env.ledger.lookup(&key).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undo_unknown_key_is_api_error() {
        let env = TestEnv::new([]);
        assert!(matches!(
            run(&env.session(), "task-0-00000000").await,
            Err(FolioError::Api(_))
        ));
    }

    #[tokio::test]
    async fn test_undo_trash_only_reverses_changed_files() {
        let env = TestEnv::new([RemoteFile::new("f1", "a.pdf"), RemoteFile::new("f2", "b.pdf")]);
        let trashed = trash::trash_files(&env.session(), &["f1"]).await.unwrap();
        let result = run(&env.session(), trashed.task_key.as_deref().unwrap())
            .await
            .unwrap();
        assert!(!env.file("f1").trashed);
        assert_eq!(result.batch.unwrap().succeeded.len(), 1);
    }

    #[tokio::test]
    async fn test_undo_restores_properties() {
        let env = TestEnv::new([RemoteFile::new("f1", "a.pdf").with_property("year", "2023")]);
        let tagged = tagging::tag_year(&env.session(), &["f1"], 2024).await.unwrap();
        run(&env.session(), tagged.task_key.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(
            env.file("f1").app_properties.get("year").map(String::as_str),
            Some("2023")
        );
    }

    #[tokio::test]
    async fn test_entry_kept_when_every_job_fails() {
        let env = TestEnv::new([RemoteFile::new("f1", "a.pdf").with_parent("P1")]);
        let moved = relocate::move_files(&env.session(), &["f1"], "P2")
            .await
            .unwrap();
        let key = moved.task_key.unwrap();

        env.remote.fail_updates_of("f1", RemoteError::forbidden("f1"));
        let result = run(&env.session(), &key).await.unwrap();
        let batch = result.batch.unwrap();
        assert_eq!(batch.failed[0].kind, FailureKind::Permission);
        assert_eq!(batch.failed[0].file_name.as_deref(), Some("a.pdf"));
        assert!(env.ledger.lookup(&key).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_partial_undo_keeps_only_failed_files() {
        let env = TestEnv::new([
            RemoteFile::new("f1", "a.pdf").with_parent("P1"),
            RemoteFile::new("f2", "b.pdf").with_parent("P1"),
        ]);
        let moved = relocate::move_files(&env.session(), &["f1", "f2"], "P2")
            .await
            .unwrap();
        let key = moved.task_key.unwrap();

        env.remote.fail_updates_of("f2", RemoteError::forbidden("f2"));
        let result = run(&env.session(), &key).await.unwrap();
        assert_eq!(result.batch.unwrap().succeeded.len(), 1);
        assert_eq!(env.file("f1").parent_ids, vec!["P1"]);

        let entry = env.ledger.lookup(&key).unwrap().unwrap();
        assert_eq!(entry.prior_state.len(), 1);
        assert_eq!(entry.prior_state[0].file_id, "f2");

        env.remote.clear_update_failures();
        let retried = run(&env.session(), &key).await.unwrap();
        assert!(retried.batch.unwrap().all_succeeded());
        assert_eq!(env.file("f2").parent_ids, vec!["P1"]);
        assert!(env.ledger.lookup(&key).unwrap().is_none());
    }
}
