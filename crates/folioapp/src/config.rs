//! # Configuration
//!
//! Folio configuration is a [`confique`] struct loaded in layers, highest priority first:
//!
//! 1. **Environment variables**: `FOLIO_CHUNK_SIZE`, `FOLIO_MAX_TASKS`, etc.
//! 2. **Config file**: `folio.toml` in the OS config directory (via `directories`),
//!    or an explicit path.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `chunk_size` | `7` | Files per executor chunk |
//! | `max_concurrent_chunks` | unset | Cap on chunks running at once (unset = all) |
//! | `max_tasks` | `30` | Undo entries retained |
//! | `max_age_hours` | `72` | Undo entry lifetime |
//! | `list_cap` | `3000` | Files accumulated by a folder listing |
//! | `page_size` | `100` | Files per listing page |
//! | `email_domain` | unset | Domain required for email-permission matching |
//! | `ledger_dir` | unset | Directory of the file-backed ledger |

use crate::error::{FolioError, Result};
use crate::executor::DEFAULT_CHUNK_SIZE;
use crate::ledger::{MAX_AGE_HOURS, MAX_TASKS};
use chrono::Duration;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "folio.toml";
pub const DEFAULT_LIST_CAP: usize = 3000;
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Configuration for folio, stored in `folio.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FolioConfig {
    #[config(env = "FOLIO_CHUNK_SIZE", default = 7)]
    pub chunk_size: usize,

    #[config(env = "FOLIO_MAX_CONCURRENT_CHUNKS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_chunks: Option<usize>,

    #[config(env = "FOLIO_MAX_TASKS", default = 30)]
    pub max_tasks: usize,

    #[config(env = "FOLIO_MAX_AGE_HOURS", default = 72)]
    pub max_age_hours: i64,

    #[config(env = "FOLIO_LIST_CAP", default = 3000)]
    pub list_cap: usize,

    #[config(env = "FOLIO_PAGE_SIZE", default = 100)]
    pub page_size: usize,

    /// e.g. "school.example"; when set, other domains never match by email.
    #[config(env = "FOLIO_EMAIL_DOMAIN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,

    #[config(env = "FOLIO_LEDGER_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_dir: Option<PathBuf>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_chunks: None,
            max_tasks: MAX_TASKS,
            max_age_hours: MAX_AGE_HOURS,
            list_cap: DEFAULT_LIST_CAP,
            page_size: DEFAULT_PAGE_SIZE,
            email_domain: None,
            ledger_dir: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

impl FolioConfig {
    /// Loads env over `path` (or the default config file) over defaults, then validates.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.map(Path::to_path_buf).or_else(Self::default_path);
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        let config = builder
            .load()
            .map_err(|e| FolioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// `ledger_dir` when set, otherwise `<data dir>/ledger`.
    pub fn ledger_dir(&self) -> Option<PathBuf> {
        self.ledger_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("ledger")))
    }

    /// `max_age_hours` as a duration; positive and small enough to represent.
    pub fn max_age(&self) -> Result<Duration> {
        if self.max_age_hours <= 0 {
            return Err(FolioError::Config("max_age_hours must be positive".into()));
        }
        Duration::try_hours(self.max_age_hours).ok_or_else(|| {
            FolioError::Config(format!("max_age_hours is too large: {}", self.max_age_hours))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FolioError::Config("chunk_size must be at least 1".into()));
        }
        if self.max_concurrent_chunks == Some(0) {
            return Err(FolioError::Config(
                "max_concurrent_chunks must be at least 1 when set".into(),
            ));
        }
        if self.max_tasks == 0 {
            return Err(FolioError::Config("max_tasks must be at least 1".into()));
        }
        self.max_age()?;
        if self.page_size == 0 || self.list_cap == 0 {
            return Err(FolioError::Config(
                "page_size and list_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
