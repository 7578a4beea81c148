//! # External Collaborators
//!
//! The engine talks to two remote services it does not own:
//!
//! - [`RemoteStore`]: the hierarchical file-storage service (`get`, paginated
//!   `list`, `update` with a [`FilePatch`]).
//! - [`RosterSource`]: the read-only student roster.
//!
//! Both report failures as [`RemoteError`], whose status code drives the per-file
//! failure classification (see [`RemoteError::kind`]).
//!
//! ## Implementations
//!
//! - [`MemRemote`] / [`MemRoster`]: in-memory fakes for tests and offline runs. The
//!   fake store can inject per-file failures and records the order and concurrency
//!   of `update` calls.
//!
//! Real clients live outside this crate and only need to implement the traits.

use crate::error::RemoteError;
use crate::model::{Grade, Homeroom, RemoteFile, StudentRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Partial update sent with `update`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub name: Option<String>,
    pub add_parents: Vec<String>,
    pub remove_parents: Vec<String>,
    pub trashed: Option<bool>,
    /// `None` values delete the property.
    pub app_properties: BTreeMap<String, Option<String>>,
}

impl FilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.add_parents.is_empty()
            && self.remove_parents.is_empty()
            && self.trashed.is_none()
            && self.app_properties.is_empty()
    }

    /// Applies the patch the way the remote service does.
    pub fn apply_to(&self, file: &mut RemoteFile) {
        if let Some(name) = &self.name {
            file.name = name.clone();
        }
        file.parent_ids.retain(|p| !self.remove_parents.contains(p));
        for parent in self.add_parents.iter().rev() {
            if !file.parent_ids.contains(parent) {
                file.parent_ids.insert(0, parent.clone());
            }
        }
        if let Some(trashed) = self.trashed {
            file.trashed = trashed;
        }
        for (key, value) in &self.app_properties {
            match value {
                Some(v) => {
                    file.app_properties.insert(key.clone(), v.clone());
                }
                None => {
                    file.app_properties.remove(key);
                }
            }
        }
        file.modified_time = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub parent_id: Option<String>,
    pub name_contains: Option<String>,
    pub include_trashed: bool,
}

impl ListQuery {
    pub fn in_folder(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, file: &RemoteFile) -> bool {
        if !self.include_trashed && file.trashed {
            return false;
        }
        if let Some(parent) = &self.parent_id {
            if !file.parent_ids.contains(parent) {
                return false;
            }
        }
        if let Some(term) = &self.name_contains {
            if !file.name.contains(term.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, id: &str) -> RemoteResult<RemoteFile>;

    async fn list(
        &self,
        query: &ListQuery,
        page_size: usize,
        page_token: Option<&str>,
    ) -> RemoteResult<Page>;

    async fn update(&self, id: &str, patch: &FilePatch) -> RemoteResult<RemoteFile>;
}

/// Follows page tokens until exhausted or `cap` files have been accumulated.
pub async fn list_all<R: RemoteStore + ?Sized>(
    remote: &R,
    query: &ListQuery,
    page_size: usize,
    cap: usize,
) -> RemoteResult<Vec<RemoteFile>> {
    let mut files = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = remote.list(query, page_size, token.as_deref()).await?;
        files.extend(page.files);
        if files.len() >= cap {
            files.truncate(cap);
            debug!(cap, "listing stopped at cap");
            break;
        }
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(files)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterFilter {
    pub grade: Option<Grade>,
    pub homeroom: Option<Homeroom>,
}

impl RosterFilter {
    pub fn grade(grade: Grade) -> Self {
        Self {
            grade: Some(grade),
            homeroom: None,
        }
    }

    pub fn matches(&self, student: &StudentRecord) -> bool {
        let grade_ok = match self.grade {
            None | Some(Grade::All) => true,
            Some(g) => student.grade == g,
        };
        let room_ok = match self.homeroom {
            None | Some(Homeroom::All) => true,
            Some(h) => student.homeroom == h,
        };
        grade_ok && room_ok
    }
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Returns the full filtered set.
    async fn list_students(&self, filter: &RosterFilter) -> RemoteResult<Vec<StudentRecord>>;
}

/// In-memory file store.
///
/// Uses `std::sync::Mutex`; no lock is ever held across an `.await`.
#[derive(Default)]
pub struct MemRemote {
    files: Mutex<HashMap<String, RemoteFile>>,
    update_failures: Mutex<HashMap<String, RemoteError>>,
    unreachable: Mutex<Option<RemoteError>>,
    update_log: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: impl IntoIterator<Item = RemoteFile>) -> Self {
        let remote = Self::new();
        for file in files {
            remote.insert(file);
        }
        remote
    }

    pub fn insert(&self, file: RemoteFile) {
        lock(&self.files).insert(file.id.clone(), file);
    }

    pub fn remove(&self, id: &str) -> Option<RemoteFile> {
        lock(&self.files).remove(id)
    }

    /// Test helper: reads a file without going through the async API.
    pub fn snapshot(&self, id: &str) -> Option<RemoteFile> {
        lock(&self.files).get(id).cloned()
    }

    /// Makes every `update` of `id` fail with `error`.
    pub fn fail_updates_of(&self, id: impl Into<String>, error: RemoteError) {
        lock(&self.update_failures).insert(id.into(), error);
    }

    pub fn clear_update_failures(&self) {
        lock(&self.update_failures).clear();
    }

    /// Makes every call fail as if the service could not be reached.
    pub fn set_unreachable(&self, error: Option<RemoteError>) {
        *lock(&self.unreachable) = error;
    }

    /// Ids passed to `update`, in call order.
    pub fn update_log(&self) -> Vec<String> {
        lock(&self.update_log).clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        match lock(&self.unreachable).as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for MemRemote {
    async fn get(&self, id: &str) -> RemoteResult<RemoteFile> {
        self.check_reachable()?;
        lock(&self.files)
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found(id))
    }

    async fn list(
        &self,
        query: &ListQuery,
        page_size: usize,
        page_token: Option<&str>,
    ) -> RemoteResult<Page> {
        self.check_reachable()?;
        let offset: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| RemoteError::new(400, format!("bad page token: {}", token)))?,
            None => 0,
        };
        let mut matching: Vec<RemoteFile> = lock(&self.files)
            .values()
            .filter(|f| query.matches(f))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let size = page_size.max(1);
        let end = (offset + size).min(matching.len());
        let files = matching.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < matching.len()).then(|| end.to_string());
        Ok(Page {
            files,
            next_page_token,
        })
    }

    async fn update(&self, id: &str, patch: &FilePatch) -> RemoteResult<RemoteFile> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        lock(&self.update_log).push(id.to_string());

        // Give sibling chunks a chance to run, like a real network round trip.
        tokio::task::yield_now().await;

        self.check_reachable()?;
        if let Some(err) = lock(&self.update_failures).get(id) {
            return Err(err.clone());
        }
        let mut files = lock(&self.files);
        let file = files.get_mut(id).ok_or_else(|| RemoteError::not_found(id))?;
        patch.apply_to(file);
        Ok(file.clone())
    }
}

#[derive(Default)]
pub struct MemRoster {
    students: Vec<StudentRecord>,
    failure: Option<RemoteError>,
}

impl MemRoster {
    pub fn new(students: Vec<StudentRecord>) -> Self {
        Self {
            students,
            failure: None,
        }
    }

    pub fn failing(error: RemoteError) -> Self {
        Self {
            students: Vec::new(),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl RosterSource for MemRoster {
    async fn list_students(&self, filter: &RosterFilter) -> RemoteResult<Vec<StudentRecord>> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self
            .students
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_with(n: usize) -> MemRemote {
        MemRemote::with_files(
            (0..n).map(|i| RemoteFile::new(format!("f{:03}", i), format!("{:03}.pdf", i)).with_parent("root")),
        )
    }

    #[test]
    fn patch_moves_primary_parent() {
        let mut file = RemoteFile::new("f", "a.pdf").with_parent("p1").with_parent("shared");
        let patch = FilePatch {
            add_parents: vec!["p2".into()],
            remove_parents: vec!["p1".into()],
            ..Default::default()
        };
        patch.apply_to(&mut file);
        assert_eq!(file.parent_ids, vec!["p2", "shared"]);
        assert_eq!(file.primary_parent(), Some("p2"));
    }

    #[test]
    fn patch_deletes_properties_with_none() {
        let mut file = RemoteFile::new("f", "a.pdf").with_property("year", "2023");
        let mut props = BTreeMap::new();
        props.insert("year".to_string(), None);
        props.insert("tag".to_string(), Some("lab".to_string()));
        FilePatch {
            app_properties: props,
            ..Default::default()
        }
        .apply_to(&mut file);
        assert!(!file.app_properties.contains_key("year"));
        assert_eq!(file.app_properties["tag"], "lab");
    }

    #[tokio::test]
    async fn list_all_follows_page_tokens() {
        let remote = folder_with(25);
        let files = list_all(&remote, &ListQuery::in_folder("root"), 10, 3000)
            .await
            .unwrap();
        assert_eq!(files.len(), 25);
        assert_eq!(files[0].name, "000.pdf");
        assert_eq!(files[24].name, "024.pdf");
    }

    #[tokio::test]
    async fn list_all_stops_at_cap() {
        let remote = folder_with(25);
        let files = list_all(&remote, &ListQuery::in_folder("root"), 10, 12)
            .await
            .unwrap();
        assert_eq!(files.len(), 12);
    }

    #[tokio::test]
    async fn list_skips_trashed_by_default() {
        let remote = folder_with(3);
        let mut trashed = remote.snapshot("f001").unwrap();
        trashed.trashed = true;
        remote.insert(trashed);

        let page = remote.list(&ListQuery::in_folder("root"), 10, None).await.unwrap();
        assert_eq!(page.files.len(), 2);
        assert_eq!(page.next_page_token, None);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let remote = folder_with(1);
        remote.fail_updates_of("f000", RemoteError::forbidden("f000"));
        let err = remote
            .update("f000", &FilePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(403));

        let err = remote.get("missing").await.unwrap_err();
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn roster_filters_by_grade_and_room() {
        let student = |id, grade, homeroom| StudentRecord {
            id,
            grade,
            homeroom,
            homeroom_number: 1,
            last: "L".into(),
            first: "F".into(),
            email: String::new(),
            folder_id: None,
        };
        let roster = MemRoster::new(vec![
            student(1, Grade::J1, Homeroom::A),
            student(2, Grade::J1, Homeroom::B),
            student(3, Grade::H1, Homeroom::A),
        ]);
        let all = roster.list_students(&RosterFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        let j1 = roster.list_students(&RosterFilter::grade(Grade::J1)).await.unwrap();
        assert_eq!(j1.len(), 2);
        let j1a = roster
            .list_students(&RosterFilter {
                grade: Some(Grade::J1),
                homeroom: Some(Homeroom::A),
            })
            .await
            .unwrap();
        assert_eq!(j1a.len(), 1);
        assert_eq!(j1a[0].id, 1);
    }
}
