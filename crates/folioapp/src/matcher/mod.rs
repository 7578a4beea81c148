//! # Student Matcher
//!
//! Associates an arbitrary file name with a roster record through a **strategy
//! cascade**: strategies run in a fixed priority order and the first one that yields
//! a *unique* student wins. There is no scoring across strategies.
//!
//! | # | strategy | signal |
//! |---|----------|--------|
//! | 1 | [`strategies::EmailPermission`] | a permission grantee with a student-style email |
//! | 2 | [`strategies::StudentNumber`] | a 7-digit id segment, optionally `b`-prefixed |
//! | 3 | [`strategies::HomeroomCodeMatch`] | a homeroom code, only when a target grade is set |
//! | 4 | [`strategies::NameTokens`] | family + given name adjacent in the name |
//!
//! A strategy that finds several distinct students does not resolve; the cascade
//! moves on. A file no strategy resolves is a normal "no match" outcome.
//!
//! Matching is pure with respect to its inputs: the roster snapshot is borrowed
//! read-only and may be shared by concurrent invocations.
//!
//! Once a student is resolved, [`naming::synthesize_name`] builds the new file name.

pub mod homeroom;
pub mod naming;
pub mod strategies;

use crate::model::{Grade, MatchCandidate, RemoteFile, StrategyKind, StudentRecord};
use crate::segments::{extract, split_extension, Segments};
use once_cell::sync::Lazy;

pub use homeroom::{parse_homeroom_code, HomeroomCode};
pub use naming::{synthesize_name, HomeroomPlacement, NamingOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Enables homeroom-code matching within this grade.
    pub grade: Option<Grade>,
    /// Domain required of student emails; any domain when `None`.
    pub email_domain: Option<String>,
}

/// What a strategy concluded, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub student: Option<StudentRecord>,
    pub reason: String,
}

impl Resolution {
    pub fn found(student: StudentRecord, reason: impl Into<String>) -> Self {
        Self {
            student: Some(student),
            reason: reason.into(),
        }
    }

    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            student: None,
            reason: reason.into(),
        }
    }
}

/// Everything a strategy may look at for one file.
pub struct MatchContext<'a> {
    pub file: &'a RemoteFile,
    pub segments: Segments,
    /// Lowercased stem with delimiters and whitespace removed.
    pub compact: String,
    pub options: &'a MatchOptions,
}

impl<'a> MatchContext<'a> {
    pub fn new(file: &'a RemoteFile, options: &'a MatchOptions) -> Self {
        let (stem, _) = split_extension(&file.name);
        let compact = stem
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.') && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        Self {
            file,
            segments: extract(&file.name),
            compact,
            options,
        }
    }
}

pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;
    fn resolve(&self, ctx: &MatchContext<'_>, roster: &[StudentRecord]) -> Resolution;
}

pub struct Matcher {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl Matcher {
    /// The production cascade, in priority order.
    pub fn standard() -> Self {
        Self::with_strategies(vec![
            Box::new(strategies::EmailPermission),
            Box::new(strategies::StudentNumber),
            Box::new(strategies::HomeroomCodeMatch),
            Box::new(strategies::NameTokens),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn match_file(
        &self,
        file: &RemoteFile,
        roster: &[StudentRecord],
        options: &MatchOptions,
    ) -> MatchCandidate {
        let ctx = MatchContext::new(file, options);
        let mut reasons = Vec::new();

        for strategy in &self.strategies {
            let resolution = strategy.resolve(&ctx, roster);
            if let Some(student) = resolution.student {
                return MatchCandidate {
                    file_id: file.id.clone(),
                    student: Some(student),
                    segments: ctx.segments.segments.clone(),
                    extension: ctx.segments.extension.clone(),
                    former_name: file.name.clone(),
                    strategy: Some(strategy.kind()),
                    reason: resolution.reason,
                };
            }
            reasons.push(format!("{}: {}", strategy.kind(), resolution.reason));
        }

        MatchCandidate {
            file_id: file.id.clone(),
            student: None,
            segments: ctx.segments.segments,
            extension: ctx.segments.extension,
            former_name: file.name.clone(),
            strategy: None,
            reason: reasons.join("; "),
        }
    }
}

static STANDARD: Lazy<Matcher> = Lazy::new(Matcher::standard);

/// Matches with the standard cascade.
pub fn match_file(
    file: &RemoteFile,
    roster: &[StudentRecord],
    options: &MatchOptions,
) -> MatchCandidate {
    STANDARD.match_file(file, roster, options)
}
