//! # Domain Model
//!
//! Data types shared by every component of the batch engine.
//!
//! ## Remote state vs. local copies
//!
//! [`RemoteFile`] is owned by the remote file-storage service. The engine only ever
//! holds read/write *copies* keyed by `id`: it reads them to decide what to change and
//! to capture the "before" state for undo, then sends patches back through the
//! [`crate::remote::RemoteStore`] collaborator.
//!
//! ## Roster snapshot
//!
//! [`StudentRecord`]s are fetched once per batch and never mutated. The snapshot is
//! shared read-only across every matcher invocation of that batch.
//!
//! ## Jobs and results
//!
//! A batch is a list of [`MutationJob`]s. The executor partitions it into chunks and
//! produces one [`ChunkResult`] per chunk, aggregated into a [`BatchResult`]. Per-file
//! failures are data ([`JobFailure`]), never errors.
//!
//! ## Undo
//!
//! Every successful batch leaves an [`UndoEntry`] whose [`PriorState`] rows carry what
//! is needed to reverse it: the former name, the former primary parent, the former
//! trashed flag and the former values of any touched app properties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A mutable file in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Ordered parent folder ids; the first one is the primary parent.
    #[serde(default)]
    pub parent_ids: Vec<String>,
    /// Year and tag metadata.
    #[serde(default)]
    pub app_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub trashed: bool,
    /// Emails of the grantees recorded in the file's permissions.
    #[serde(default)]
    pub permission_emails: Vec<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: String::new(),
            parent_ids: Vec::new(),
            app_properties: BTreeMap::new(),
            trashed: false,
            permission_emails: Vec::new(),
            created_time: Some(now),
            modified_time: Some(now),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_ids.push(parent_id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.app_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_permission(mut self, email: impl Into<String>) -> Self {
        self.permission_emails.push(email.into());
        self
    }

    pub fn primary_parent(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }
}

/// School grade. `All` is the "no filter" value used by roster queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(alias = "ALL", alias = "all")]
    All,
    #[serde(alias = "中1")]
    J1,
    #[serde(alias = "中2")]
    J2,
    #[serde(alias = "中3")]
    J3,
    #[serde(alias = "高1")]
    H1,
    #[serde(alias = "高2")]
    H2,
    #[serde(alias = "高3")]
    H3,
}

impl Grade {
    pub const LEVELS: [Grade; 6] = [
        Grade::J1,
        Grade::J2,
        Grade::J3,
        Grade::H1,
        Grade::H2,
        Grade::H3,
    ];

    /// Label used in synthesized file names.
    pub fn label(&self) -> &'static str {
        match self {
            Grade::All => "",
            Grade::J1 => "中1",
            Grade::J2 => "中2",
            Grade::J3 => "中3",
            Grade::H1 => "高1",
            Grade::H2 => "高2",
            Grade::H3 => "高3",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::All => write!(f, "ALL"),
            other => write!(f, "{}", other.label()),
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_uppercase().as_str() {
            "ALL" | "" => return Ok(Grade::All),
            "J1" => return Ok(Grade::J1),
            "J2" => return Ok(Grade::J2),
            "J3" => return Ok(Grade::J3),
            "H1" => return Ok(Grade::H1),
            "H2" => return Ok(Grade::H2),
            "H3" => return Ok(Grade::H3),
            _ => {}
        }
        Grade::LEVELS
            .into_iter()
            .find(|g| g.label() == trimmed)
            .ok_or_else(|| format!("unknown grade: {}", s))
    }
}

/// Lettered class section. `All` is the "no filter" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Homeroom {
    #[serde(alias = "ALL", alias = "all")]
    All,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Homeroom {
    /// Case-insensitive conversion from a section letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Homeroom::A),
            'B' => Some(Homeroom::B),
            'C' => Some(Homeroom::C),
            'D' => Some(Homeroom::D),
            'E' => Some(Homeroom::E),
            'F' => Some(Homeroom::F),
            _ => None,
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Homeroom::All => "",
            Homeroom::A => "A",
            Homeroom::B => "B",
            Homeroom::C => "C",
            Homeroom::D => "D",
            Homeroom::E => "E",
            Homeroom::F => "F",
        }
    }
}

impl FromStr for Homeroom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Homeroom::All);
        }
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Homeroom::from_letter(c),
            _ => None,
        }
        .ok_or_else(|| format!("unknown homeroom: {}", s))
    }
}

/// One row of the roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: u32,
    pub grade: Grade,
    pub homeroom: Homeroom,
    pub homeroom_number: u32,
    pub last: String,
    pub first: String,
    pub email: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl StudentRecord {
    /// Family name followed by given name, no separator.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.last, self.first)
    }

    /// `中1A07`-style code used in synthesized names.
    pub fn homeroom_code(&self) -> String {
        format!(
            "{}{}{:02}",
            self.grade.label(),
            self.homeroom.letter(),
            self.homeroom_number
        )
    }
}

/// Strategies of the matcher cascade, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    EmailPermission,
    StudentNumber,
    HomeroomCode,
    NameTokens,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::EmailPermission => "email",
            StrategyKind::StudentNumber => "student-number",
            StrategyKind::HomeroomCode => "homeroom-code",
            StrategyKind::NameTokens => "name",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of matching one file against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub file_id: String,
    pub student: Option<StudentRecord>,
    pub segments: Vec<String>,
    pub extension: Option<String>,
    /// File name at match time, kept for undo.
    pub former_name: String,
    pub strategy: Option<StrategyKind>,
    pub reason: String,
}

impl MatchCandidate {
    pub fn is_match(&self) -> bool {
        self.student.is_some()
    }
}

/// The change a job applies to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    Rename {
        name: Option<String>,
    },
    Move {
        from: Option<String>,
        to: Option<String>,
    },
    Trash,
    Untrash,
    /// `None` values delete the property.
    SetProperties {
        properties: BTreeMap<String, Option<String>>,
    },
}

impl Mutation {
    pub fn task_kind(&self) -> TaskKind {
        match self {
            Mutation::Rename { .. } => TaskKind::Rename,
            Mutation::Move { .. } => TaskKind::Move,
            Mutation::Trash => TaskKind::Trash,
            Mutation::Untrash => TaskKind::Untrash,
            Mutation::SetProperties { .. } => TaskKind::SetProperties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationJob {
    pub file_id: String,
    pub mutation: Mutation,
}

impl MutationJob {
    pub fn new(file_id: impl Into<String>, mutation: Mutation) -> Self {
        Self {
            file_id: file_id.into(),
            mutation,
        }
    }

    pub fn rename(file_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            file_id,
            Mutation::Rename {
                name: Some(name.into()),
            },
        )
    }

    pub fn move_to(
        file_id: impl Into<String>,
        from: Option<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(
            file_id,
            Mutation::Move {
                from,
                to: Some(to.into()),
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed or missing job field, caught before any remote call.
    Validation,
    /// Remote 403.
    Permission,
    /// Network or 5xx.
    Transient,
    /// The file id no longer exists.
    NotFound,
    /// Any other remote refusal (4xx).
    Rejected,
    /// Not attempted because the batch was cancelled.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Validation => "invalid job",
            FailureKind::Permission => "permission denied",
            FailureKind::Transient => "remote unavailable",
            FailureKind::NotFound => "not found",
            FailureKind::Rejected => "rejected",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub file_id: String,
    pub file_name: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(file_id: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: None,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkResult {
    pub chunk_index: usize,
    pub succeeded: Vec<RemoteFile>,
    pub failed: Vec<JobFailure>,
}

impl ChunkResult {
    pub fn new(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregate of every chunk of one `execute` call, in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: Vec<RemoteFile>,
    pub failed: Vec<JobFailure>,
    pub total_requested: usize,
    pub chunk_count: usize,
}

impl BatchResult {
    pub fn absorb(&mut self, chunk: ChunkResult) {
        self.succeeded.extend(chunk.succeeded);
        self.failed.extend(chunk.failed);
        self.chunk_count += 1;
    }

    /// Adds failures detected before dispatch (preload misses and the like).
    pub fn with_preflight_failures(mut self, failures: Vec<JobFailure>) -> Self {
        self.total_requested += failures.len();
        self.failed.extend(failures);
        self
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &JobFailure> {
        self.failed.iter().filter(move |f| f.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Rename,
    Move,
    Trash,
    Untrash,
    SetProperties,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Rename => "rename",
            TaskKind::Move => "move",
            TaskKind::Trash => "trash",
            TaskKind::Untrash => "untrash",
            TaskKind::SetProperties => "set-properties",
        };
        write!(f, "{}", name)
    }
}

/// The "before" state of one file, sufficient to reverse one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorState {
    pub file_id: String,
    /// Name before the batch.
    pub name: String,
    /// Name written by a rename batch.
    #[serde(default)]
    pub applied_name: Option<String>,
    /// Primary parent before the batch.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Parent written by a move batch.
    #[serde(default)]
    pub moved_to: Option<String>,
    #[serde(default)]
    pub trashed: bool,
    /// Former values of the properties a batch touched; `None` = was absent.
    #[serde(default)]
    pub properties: BTreeMap<String, Option<String>>,
}

impl PriorState {
    /// Snapshots `file` before `mutation` is applied to it.
    pub fn capture(file: &RemoteFile, mutation: &Mutation) -> Self {
        let mut prior = Self {
            file_id: file.id.clone(),
            name: file.name.clone(),
            applied_name: None,
            parent_id: file.primary_parent().map(str::to_string),
            moved_to: None,
            trashed: file.trashed,
            properties: BTreeMap::new(),
        };
        match mutation {
            Mutation::Rename { name } => prior.applied_name = name.clone(),
            Mutation::Move { from, to } => {
                if from.is_some() {
                    prior.parent_id = from.clone();
                }
                prior.moved_to = to.clone();
            }
            Mutation::SetProperties { properties } => {
                prior.properties = properties
                    .keys()
                    .map(|k| (k.clone(), file.app_properties.get(k).cloned()))
                    .collect();
            }
            Mutation::Trash | Mutation::Untrash => {}
        }
        prior
    }
}

/// One ledger record: enough to reverse a completed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub kind: TaskKind,
    pub prior_state: Vec<PriorState>,
}

impl UndoEntry {
    /// Jobs that put every recorded file back in its prior state.
    ///
    /// Trash and untrash entries only reverse files whose flag actually changed.
    pub fn inverse_jobs(&self) -> Vec<MutationJob> {
        self.prior_state
            .iter()
            .filter_map(|prior| {
                let mutation = match self.kind {
                    TaskKind::Rename => Mutation::Rename {
                        name: Some(prior.name.clone()),
                    },
                    TaskKind::Move => Mutation::Move {
                        from: prior.moved_to.clone(),
                        to: prior.parent_id.clone(),
                    },
                    TaskKind::Trash if !prior.trashed => Mutation::Untrash,
                    TaskKind::Untrash if prior.trashed => Mutation::Trash,
                    TaskKind::Trash | TaskKind::Untrash => return None,
                    TaskKind::SetProperties => Mutation::SetProperties {
                        properties: prior.properties.clone(),
                    },
                };
                Some(MutationJob::new(prior.file_id.clone(), mutation))
            })
            .collect()
    }
}
