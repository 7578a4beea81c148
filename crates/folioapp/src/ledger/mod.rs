//! # Task/Undo Ledger
//!
//! Persists, for each completed batch, the per-file "before" state needed to reverse
//! it, on top of an injectable [`KvStore`].
//!
//! ## Entry lifecycle
//!
//! ```text
//! Created -> Active -> { Replayed | Expired | Evicted } -> Gone
//! ```
//!
//! - **Replayed**: the caller replays an entry and then calls [`Ledger::remove`].
//! - **Expired**: older than `max_age` (3 days by default).
//! - **Evicted**: beyond the newest `max_tasks` (30 by default), oldest first.
//!
//! Expiry is lazy: [`Ledger::lookup`] and [`Ledger::list_recent`] hide expired
//! entries but never delete anything. Physical removal happens in [`Ledger::prune`],
//! which [`Ledger::record`] runs after every write, so the store never holds more
//! than `max_tasks` entries after a `record`.
//!
//! ## Concurrency
//!
//! The store sits behind a mutex: one writer at a time, which keeps the "newest N"
//! eviction free of lost updates. Ledger writes happen once per batch, never per file.
//!
//! ## Replay
//!
//! The ledger does not call the executor. It hands out entries;
//! [`crate::commands::undo`] turns them into inverse jobs.
//!
//! ## Keys
//!
//! `task-<unix millis>-<8 hex chars>`; the random suffix keeps two batches recorded in
//! the same millisecond apart.

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::KvStore;
pub use fs_backend::FsKv;
pub use mem_backend::MemKv;

use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::model::{PriorState, TaskKind, UndoEntry};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const TASK_PREFIX: &str = "task-";
pub const MAX_TASKS: usize = 30;
pub const MAX_AGE_HOURS: i64 = 72;
pub const DEFAULT_RECENT: usize = 30;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub expired: usize,
    pub evicted: usize,
    /// Entries that could not be decoded.
    pub corrupt: usize,
}

pub struct Ledger<S: KvStore> {
    store: Mutex<S>,
    max_tasks: usize,
    max_age: Duration,
    clock: Clock,
}

impl<S: KvStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
            max_tasks: MAX_TASKS,
            max_age: Duration::hours(MAX_AGE_HOURS),
            clock: Arc::new(Utc::now),
        }
    }

    /// Fails with `FolioError::Config` when `max_age_hours` cannot be represented.
    pub fn from_config(store: S, config: &FolioConfig) -> Result<Self> {
        Ok(Self::new(store).with_limits(config.max_tasks, config.max_age()?))
    }

    pub fn with_limits(mut self, max_tasks: usize, max_age: Duration) -> Self {
        self.max_tasks = max_tasks.max(1);
        self.max_age = max_age;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| FolioError::Store("ledger lock poisoned".to_string()))
    }

    fn is_expired(&self, entry: &UndoEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.max_age
    }

    /// Stores a new entry and prunes. Returns the entry key.
    pub fn record(&self, kind: TaskKind, prior_state: Vec<PriorState>) -> Result<String> {
        if prior_state.is_empty() {
            return Err(FolioError::Api(
                "Nothing to record: no file state captured".to_string(),
            ));
        }
        if prior_state.iter().any(|p| p.file_id.trim().is_empty()) {
            return Err(FolioError::Api(
                "Cannot record file state without a file id".to_string(),
            ));
        }

        let now = (self.clock)();
        let mut store = self.lock()?;

        let key = loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let candidate = format!("{}{}-{}", TASK_PREFIX, now.timestamp_millis(), &suffix[..8]);
            if store.get(&candidate)?.is_none() {
                break candidate;
            }
        };

        let entry = UndoEntry {
            key: key.clone(),
            created_at: now,
            kind,
            prior_state,
        };
        let bytes = serde_json::to_vec(&entry)?;
        store.set(&key, &bytes)?;
        info!(%key, %kind, files = entry.prior_state.len(), "recorded task");

        self.prune_locked(&mut store, now)?;
        Ok(key)
    }

    /// Returns `None` for absent and expired keys. Never deletes.
    pub fn lookup(&self, key: &str) -> Result<Option<UndoEntry>> {
        let now = (self.clock)();
        let store = self.lock()?;
        let Some(bytes) = store.get(key)? else {
            return Ok(None);
        };
        let entry: UndoEntry = serde_json::from_slice(&bytes)?;
        if self.is_expired(&entry, now) {
            debug!(%key, "lookup of expired task");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Live entries, newest first, at most `max`.
    pub fn list_recent(&self, max: usize) -> Result<Vec<UndoEntry>> {
        let now = (self.clock)();
        let store = self.lock()?;
        let mut entries: Vec<UndoEntry> = load_entries(&*store)?
            .into_iter()
            .filter_map(|(_, decoded)| decoded)
            .filter(|e| !self.is_expired(e, now))
            .collect();
        sort_newest_first(&mut entries);
        entries.truncate(max);
        Ok(entries)
    }

    /// Deletes a replayed entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut store = self.lock()?;
        let existed = store.get(key)?.is_some();
        store.delete(key)?;
        if existed {
            info!(%key, "removed task");
        }
        Ok(existed)
    }

    /// Narrows an entry to the files in `keep`, leaving its key and age untouched.
    /// An entry left with no files is deleted. Returns whether the entry remains.
    pub fn retain_files(&self, key: &str, keep: &HashSet<&str>) -> Result<bool> {
        let mut store = self.lock()?;
        let Some(bytes) = store.get(key)? else {
            return Ok(false);
        };
        let mut entry: UndoEntry = serde_json::from_slice(&bytes)?;
        entry
            .prior_state
            .retain(|p| keep.contains(p.file_id.as_str()));
        if entry.prior_state.is_empty() {
            store.delete(key)?;
            info!(%key, "removed task");
            return Ok(false);
        }
        store.set(key, &serde_json::to_vec(&entry)?)?;
        info!(%key, files = entry.prior_state.len(), "narrowed task");
        Ok(true)
    }

    pub fn prune(&self) -> Result<PruneReport> {
        let now = (self.clock)();
        let mut store = self.lock()?;
        self.prune_locked(&mut store, now)
    }

    fn prune_locked(&self, store: &mut S, now: DateTime<Utc>) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        let mut live = Vec::new();

        for (key, decoded) in load_entries(&*store)? {
            match decoded {
                None => {
                    store.delete(&key)?;
                    report.corrupt += 1;
                }
                Some(entry) if self.is_expired(&entry, now) => {
                    store.delete(&key)?;
                    report.expired += 1;
                }
                Some(entry) => live.push(entry),
            }
        }

        sort_newest_first(&mut live);
        for entry in live.iter().skip(self.max_tasks) {
            store.delete(&entry.key)?;
            report.evicted += 1;
        }

        debug!(
            expired = report.expired,
            evicted = report.evicted,
            corrupt = report.corrupt,
            "pruned ledger"
        );
        Ok(report)
    }
}

/// Every task key with its decoded entry, `None` when the value is unreadable.
fn load_entries<S: KvStore>(store: &S) -> Result<Vec<(String, Option<UndoEntry>)>> {
    let mut entries = Vec::new();
    for key in store.keys(TASK_PREFIX)? {
        let Some(bytes) = store.get(&key)? else {
            continue;
        };
        match serde_json::from_slice::<UndoEntry>(&bytes) {
            Ok(entry) => entries.push((key, Some(entry))),
            Err(err) => {
                warn!(%key, error = %err, "skipping unreadable task");
                entries.push((key, None));
            }
        }
    }
    Ok(entries)
}

fn sort_newest_first(entries: &mut [UndoEntry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.key.cmp(&a.key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mutation, RemoteFile};

    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn start() -> Self {
            Self(Arc::new(Mutex::new(Utc::now())))
        }

        fn clock(&self) -> Clock {
            let now = Arc::clone(&self.0);
            Arc::new(move || *now.lock().unwrap())
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    fn prior(id: &str) -> Vec<PriorState> {
        vec![PriorState::capture(
            &RemoteFile::new(id, "before.pdf"),
            &Mutation::Rename {
                name: Some("after.pdf".into()),
            },
        )]
    }

    fn ledger(clock: &TestClock) -> Ledger<MemKv> {
        Ledger::new(MemKv::new()).with_clock(clock.clock())
    }

    #[test]
    fn record_then_lookup() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let key = ledger.record(TaskKind::Rename, prior("f1")).unwrap();

        assert!(key.starts_with(TASK_PREFIX));
        let entry = ledger.lookup(&key).unwrap().unwrap();
        assert_eq!(entry.kind, TaskKind::Rename);
        assert_eq!(entry.prior_state[0].name, "before.pdf");
        assert_eq!(entry.prior_state[0].applied_name.as_deref(), Some("after.pdf"));
    }

    #[test]
    fn keys_are_unique_within_one_instant() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let a = ledger.record(TaskKind::Rename, prior("f1")).unwrap();
        let b = ledger.record(TaskKind::Rename, prior("f2")).unwrap();
        assert_ne!(a, b);
        assert_eq!(ledger.list_recent(10).unwrap().len(), 2);
    }

    #[test]
    fn lookup_of_absent_key_is_none() {
        let clock = TestClock::start();
        assert!(ledger(&clock).lookup("task-0-deadbeef").unwrap().is_none());
    }

    #[test]
    fn rejects_empty_and_idless_state() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        assert!(ledger.record(TaskKind::Trash, Vec::new()).is_err());
        assert!(ledger.record(TaskKind::Trash, prior("")).is_err());
    }

    #[test]
    fn expired_entries_are_hidden_but_not_deleted_by_reads() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let key = ledger.record(TaskKind::Move, prior("f1")).unwrap();

        clock.advance(Duration::hours(MAX_AGE_HOURS));
        assert!(ledger.lookup(&key).unwrap().is_some());

        clock.advance(Duration::seconds(1));
        assert!(ledger.lookup(&key).unwrap().is_none());
        assert!(ledger.list_recent(DEFAULT_RECENT).unwrap().is_empty());
        assert_eq!(ledger.lock().unwrap().len(), 1);

        let report = ledger.prune().unwrap();
        assert_eq!(report.expired, 1);
        assert!(ledger.lock().unwrap().is_empty());
    }

    #[test]
    fn record_evicts_oldest_beyond_max_tasks() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let mut keys = Vec::new();
        for i in 0..(MAX_TASKS + 5) {
            keys.push(ledger.record(TaskKind::Rename, prior(&format!("f{}", i))).unwrap());
            clock.advance(Duration::seconds(1));
            assert!(ledger.lock().unwrap().len() <= MAX_TASKS);
        }

        let recent = ledger.list_recent(100).unwrap();
        assert_eq!(recent.len(), MAX_TASKS);
        assert_eq!(recent[0].key, keys[keys.len() - 1]);
        for evicted in &keys[..5] {
            assert!(ledger.lookup(evicted).unwrap().is_none());
        }
    }

    #[test]
    fn list_recent_is_newest_first_and_bounded() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let first = ledger.record(TaskKind::Trash, prior("a")).unwrap();
        clock.advance(Duration::minutes(5));
        let second = ledger.record(TaskKind::Untrash, prior("b")).unwrap();

        let recent = ledger.list_recent(10).unwrap();
        assert_eq!(recent[0].key, second);
        assert_eq!(recent[1].key, first);
        assert_eq!(ledger.list_recent(1).unwrap().len(), 1);
    }

    #[test]
    fn remove_reports_existence() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let key = ledger.record(TaskKind::Rename, prior("f1")).unwrap();
        assert!(ledger.remove(&key).unwrap());
        assert!(!ledger.remove(&key).unwrap());
        assert!(ledger.lookup(&key).unwrap().is_none());
    }

    #[test]
    fn prune_drops_unreadable_entries() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        ledger.record(TaskKind::Rename, prior("f1")).unwrap();
        ledger
            .lock()
            .unwrap()
            .set("task-1-garbage0", b"not json")
            .unwrap();

        assert_eq!(ledger.list_recent(10).unwrap().len(), 1);
        let report = ledger.prune().unwrap();
        assert_eq!(report.corrupt, 1);
        assert_eq!(ledger.lock().unwrap().len(), 1);
    }

    #[test]
    fn write_failure_propagates() {
        let clock = TestClock::start();
        let mut kv = MemKv::new();
        kv.set_simulate_write_error(true);
        let ledger = Ledger::new(kv).with_clock(clock.clock());
        assert!(matches!(
            ledger.record(TaskKind::Rename, prior("f1")),
            Err(FolioError::Store(_))
        ));
    }

    #[test]
    fn custom_limits() {
        let clock = TestClock::start();
        let ledger = Ledger::new(MemKv::new())
            .with_clock(clock.clock())
            .with_limits(2, Duration::minutes(10));
        for i in 0..4 {
            ledger.record(TaskKind::Rename, prior(&format!("f{}", i))).unwrap();
            clock.advance(Duration::seconds(1));
        }
        assert_eq!(ledger.list_recent(10).unwrap().len(), 2);
        clock.advance(Duration::minutes(11));
        assert!(ledger.list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn concurrent_records_keep_unique_keys_within_the_cap() {
        let ledger = Ledger::new(MemKv::new()).with_limits(5, Duration::hours(1));
        let keys = Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let ledger = &ledger;
                let keys = &keys;
                scope.spawn(move || {
                    for i in 0..10 {
                        let key = ledger
                            .record(TaskKind::Trash, prior(&format!("f{}-{}", worker, i)))
                            .unwrap();
                        assert!(ledger.lock().unwrap().len() <= 5);
                        keys.lock().unwrap().push(key);
                    }
                });
            }
        });

        let keys = keys.into_inner().unwrap();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), 80);
        assert_eq!(unique.len(), 80);
        assert_eq!(ledger.list_recent(100).unwrap().len(), 5);
    }

    #[test]
    fn from_config_rejects_unrepresentable_max_age() {
        let config = FolioConfig {
            max_age_hours: i64::MAX / 1000,
            ..Default::default()
        };
        assert!(matches!(
            Ledger::from_config(MemKv::new(), &config),
            Err(FolioError::Config(_))
        ));
        let ledger = Ledger::from_config(MemKv::new(), &FolioConfig::default()).unwrap();
        assert_eq!(ledger.max_tasks(), MAX_TASKS);
    }

    #[test]
    fn retain_files_narrows_in_place() {
        let clock = TestClock::start();
        let ledger = ledger(&clock);
        let mut state = prior("f1");
        state.extend(prior("f2"));
        let key = ledger.record(TaskKind::Rename, state).unwrap();
        let created = ledger.lookup(&key).unwrap().unwrap().created_at;

        assert!(ledger.retain_files(&key, &HashSet::from(["f2"])).unwrap());
        let entry = ledger.lookup(&key).unwrap().unwrap();
        assert_eq!(entry.prior_state.len(), 1);
        assert_eq!(entry.prior_state[0].file_id, "f2");
        assert_eq!(entry.created_at, created);

        assert!(!ledger.retain_files(&key, &HashSet::new()).unwrap());
        assert!(ledger.lookup(&key).unwrap().is_none());
    }
}
