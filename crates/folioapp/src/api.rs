//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single entry
//! point for every folio operation, whatever the UI.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns the collaborators**: the remote store, the roster source, the ledger and
//!   the configuration
//! - **Dispatches** to the appropriate command function
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no business logic (that belongs in `commands/*.rs`) and no presentation.
//!
//! ## Generic Over the Collaborators
//!
//! `FolioApi<R: RemoteStore, K: KvStore>`:
//! - Production: a real remote client with `FsKv`
//! - Testing: `MemRemote` with `MemKv`
//!
//! ## Cancellation
//!
//! Every batch method runs with the facade's [`CancelToken`]. Cancelling it makes
//! running batches record their unstarted jobs as cancelled; [`FolioApi::reset_cancel`]
//! arms a fresh token for the next batch.

use crate::commands::{self, csv_io::ImportedRows, selection::Selection, Session};
use crate::config::FolioConfig;
use crate::error::Result;
use crate::executor::CancelToken;
use crate::ledger::{KvStore, Ledger};
use crate::matcher::{MatchOptions, NamingOptions};
use crate::remote::{RemoteStore, RosterFilter, RosterSource};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct FolioApi<R: RemoteStore + ?Sized, K: KvStore> {
    remote: Arc<R>,
    roster: Arc<dyn RosterSource>,
    ledger: Ledger<K>,
    config: FolioConfig,
    cancel: CancelToken,
}

impl<R: RemoteStore + ?Sized + 'static, K: KvStore> FolioApi<R, K> {
    pub fn new(
        remote: Arc<R>,
        roster: Arc<dyn RosterSource>,
        store: K,
        config: FolioConfig,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = Ledger::from_config(store, &config)?;
        Ok(Self {
            remote,
            roster,
            ledger,
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Swaps the ledger, e.g. for one with a test clock.
    pub fn with_ledger(mut self, ledger: Ledger<K>) -> Self {
        self.ledger = ledger;
        self
    }

    fn session(&self) -> Session<'_, R, K> {
        Session::new(&self.remote, &self.ledger, &self.config).with_cancel(self.cancel.clone())
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger<K> {
        &self.ledger
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn reset_cancel(&mut self) {
        self.cancel = CancelToken::new();
    }

    pub async fn list_folder(&self, folder_id: &str) -> Result<commands::CmdResult> {
        commands::listing::list_folder(self.remote.as_ref(), &self.config, folder_id).await
    }

    /// Lists a folder straight into a fresh selection.
    pub async fn select_folder(&self, folder_id: &str) -> Result<Selection> {
        let listed = self.list_folder(folder_id).await?;
        Ok(Selection::new(listed.listed_files))
    }

    pub async fn preview_renames<I: AsRef<str>>(
        &self,
        ids: &[I],
        filter: &RosterFilter,
        options: &MatchOptions,
        naming: &NamingOptions,
    ) -> Result<commands::CmdResult> {
        commands::rename::preview(&self.session(), self.roster.as_ref(), ids, filter, options, naming)
            .await
    }

    pub async fn rename_files<I: AsRef<str>>(
        &self,
        ids: &[I],
        filter: &RosterFilter,
        options: &MatchOptions,
        naming: &NamingOptions,
    ) -> Result<commands::CmdResult> {
        commands::rename::run(&self.session(), self.roster.as_ref(), ids, filter, options, naming)
            .await
    }

    pub async fn relocate_to_student_folders<I: AsRef<str>>(
        &self,
        ids: &[I],
        filter: &RosterFilter,
        options: &MatchOptions,
    ) -> Result<commands::CmdResult> {
        commands::relocate::to_student_folders(
            &self.session(),
            self.roster.as_ref(),
            ids,
            filter,
            options,
        )
        .await
    }

    pub async fn move_files<I: AsRef<str>>(
        &self,
        ids: &[I],
        destination: &str,
    ) -> Result<commands::CmdResult> {
        commands::relocate::move_files(&self.session(), ids, destination).await
    }

    pub async fn trash_files<I: AsRef<str>>(&self, ids: &[I]) -> Result<commands::CmdResult> {
        commands::trash::trash_files(&self.session(), ids).await
    }

    pub async fn untrash_files<I: AsRef<str>>(&self, ids: &[I]) -> Result<commands::CmdResult> {
        commands::trash::untrash_files(&self.session(), ids).await
    }

    pub async fn set_properties<I: AsRef<str>>(
        &self,
        ids: &[I],
        properties: &BTreeMap<String, Option<String>>,
    ) -> Result<commands::CmdResult> {
        commands::tagging::set_properties(&self.session(), ids, properties).await
    }

    pub async fn tag_year<I: AsRef<str>>(&self, ids: &[I], year: i32) -> Result<commands::CmdResult> {
        commands::tagging::tag_year(&self.session(), ids, year).await
    }

    pub async fn undo(&self, key: &str) -> Result<commands::CmdResult> {
        commands::undo::run(&self.session(), key).await
    }

    pub async fn apply_rows(&self, rows: &ImportedRows) -> Result<commands::CmdResult> {
        commands::csv_io::apply_rows(&self.session(), rows).await
    }

    pub fn tasks(&self, max: usize) -> Result<commands::CmdResult> {
        commands::tasks::list(&self.ledger, max)
    }

    pub fn show_task(&self, key: &str) -> Result<commands::CmdResult> {
        commands::tasks::show(&self.ledger, key)
    }

    pub fn prune(&self) -> Result<commands::CmdResult> {
        commands::tasks::prune(&self.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FolioError;
    use crate::ledger::MemKv;
    use crate::model::{Grade, RemoteFile};
    use crate::remote::{MemRemote, MemRoster};
    use crate::test_utils::roster;

    fn api(files: Vec<RemoteFile>) -> FolioApi<MemRemote, MemKv> {
        FolioApi::new(
            Arc::new(MemRemote::with_files(files)),
            Arc::new(MemRoster::new(roster())),
            MemKv::new(),
            FolioConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FolioConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let result = FolioApi::new(
            Arc::new(MemRemote::new()),
            Arc::new(MemRoster::default()),
            MemKv::new(),
            config,
        );
        assert!(matches!(result, Err(FolioError::Config(_))));
    }

    #[tokio::test]
    async fn test_select_then_rename_then_undo() {
        let api = api(vec![
            RemoteFile::new("f1", "b1234567.pdf").with_parent("inbox"),
            RemoteFile::new("f2", "other.pdf").with_parent("elsewhere"),
        ]);
        let mut selection = api.select_folder("inbox").await.unwrap();
        selection.select_all();

        let result = api
            .rename_files(
                &selection.checked_ids(),
                &RosterFilter::grade(Grade::J1),
                &MatchOptions::default(),
                &NamingOptions::default(),
            )
            .await
            .unwrap();
        let key = result.task_key.unwrap();
        assert_eq!(api.tasks(10).unwrap().tasks.len(), 1);

        api.undo(&key).await.unwrap();
        let listed = api.list_folder("inbox").await.unwrap();
        assert_eq!(listed.listed_files[0].name, "b1234567.pdf");
        assert!(api.tasks(10).unwrap().tasks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_cancelled_jobs() {
        let api = api(vec![RemoteFile::new("f1", "a.pdf")]);
        api.cancel_token().cancel();
        let result = api.trash_files(&["f1"]).await.unwrap();
        let batch = result.batch.unwrap();
        assert_eq!(batch.failed.len(), 1);
        assert!(result.task_key.is_none());
    }
}
