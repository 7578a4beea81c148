//! The four identification strategies of the cascade.

use super::homeroom::parse_homeroom_code;
use super::{MatchContext, Resolution, Strategy};
use crate::model::{Grade, StrategyKind, StudentRecord};
use once_cell::sync::Lazy;
use regex::Regex;

static STUDENT_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[a-z0-9]+-[a-z0-9]+@([a-z0-9.-]+)$").expect("valid email regex")
});

static STUDENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[bB]?(\d{7})$").expect("valid student number regex"));

/// Collapses a list of hits into a resolution: one distinct student resolves,
/// none or several do not.
fn unique(hits: Vec<&StudentRecord>, what: &str) -> Resolution {
    let mut distinct: Vec<&StudentRecord> = Vec::new();
    for hit in hits {
        if !distinct.iter().any(|s| s.id == hit.id) {
            distinct.push(hit);
        }
    }
    match distinct.as_slice() {
        [] => Resolution::none(format!("no student for {}", what)),
        [student] => Resolution::found((*student).clone(), format!("resolved by {}", what)),
        many => Resolution::none(format!(
            "{} is ambiguous ({} students)",
            what,
            many.len()
        )),
    }
}

/// Resolves through a permission grantee whose email looks like a student address
/// (`t-yamada@school.example`).
pub struct EmailPermission;

impl Strategy for EmailPermission {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmailPermission
    }

    fn resolve(&self, ctx: &MatchContext<'_>, roster: &[StudentRecord]) -> Resolution {
        let student_emails: Vec<&str> = ctx
            .file
            .permission_emails
            .iter()
            .map(String::as_str)
            .filter(|email| match STUDENT_EMAIL.captures(email) {
                Some(caps) => match &ctx.options.email_domain {
                    Some(domain) => caps
                        .get(1)
                        .is_some_and(|d| d.as_str().eq_ignore_ascii_case(domain)),
                    None => true,
                },
                None => false,
            })
            .collect();

        if student_emails.is_empty() {
            return Resolution::none("no student email among permissions");
        }

        let hits = roster
            .iter()
            .filter(|s| student_emails.iter().any(|e| e.eq_ignore_ascii_case(&s.email)))
            .collect();
        unique(hits, "permission email")
    }
}

/// Resolves a 7-digit student id segment, optionally prefixed with `b`.
pub struct StudentNumber;

impl Strategy for StudentNumber {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StudentNumber
    }

    fn resolve(&self, ctx: &MatchContext<'_>, roster: &[StudentRecord]) -> Resolution {
        let ids: Vec<u32> = ctx
            .segments
            .segments
            .iter()
            .filter_map(|seg| STUDENT_NUMBER.captures(seg))
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
            .collect();

        if ids.is_empty() {
            return Resolution::none("no student number segment");
        }

        let hits = roster.iter().filter(|s| ids.contains(&s.id)).collect();
        unique(hits, "student number")
    }
}

/// Resolves `(grade, homeroom, number)`; only runs when a target grade is given.
pub struct HomeroomCodeMatch;

impl Strategy for HomeroomCodeMatch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HomeroomCode
    }

    fn resolve(&self, ctx: &MatchContext<'_>, roster: &[StudentRecord]) -> Resolution {
        let grade = match ctx.options.grade {
            Some(grade) if grade != Grade::All => grade,
            _ => return Resolution::none("no target grade"),
        };

        let Some(code) = parse_homeroom_code(&ctx.segments.joined()) else {
            return Resolution::none("no homeroom code");
        };

        let hits = roster
            .iter()
            .filter(|s| {
                s.grade == grade && s.homeroom == code.homeroom && s.homeroom_number == code.number
            })
            .collect();
        unique(
            hits,
            &format!("homeroom code {}{}", code.homeroom.letter(), code.number),
        )
    }
}

/// Resolves when family and given name appear adjacently, either as two
/// consecutive segments or concatenated anywhere in the name.
pub struct NameTokens;

impl NameTokens {
    fn matches(ctx: &MatchContext<'_>, student: &StudentRecord) -> bool {
        let last = student.last.trim().to_lowercase();
        let first = student.first.trim().to_lowercase();
        if last.is_empty() || first.is_empty() {
            return false;
        }

        let lowered: Vec<String> = ctx
            .segments
            .segments
            .iter()
            .map(|s| s.trim().to_lowercase())
            .collect();
        let adjacent = lowered
            .windows(2)
            .any(|pair| pair[0] == last && pair[1] == first);

        adjacent || ctx.compact.contains(&format!("{}{}", last, first))
    }
}

impl Strategy for NameTokens {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NameTokens
    }

    fn resolve(&self, ctx: &MatchContext<'_>, roster: &[StudentRecord]) -> Resolution {
        let hits = roster.iter().filter(|s| Self::matches(ctx, s)).collect();
        unique(hits, "name")
    }
}
