//! New file names for matched files.
//!
//! Parts are joined with `_` and the original extension is re-appended:
//!
//! ```text
//! Omit:     <id>_<last><first>[_<label>][_<residual>...].<ext>
//! Prefix:   <grade><room><nn>_<id>_<last><first>[_<label>][_<residual>...].<ext>
//! Embedded: <id>_<grade><room><nn>_<last><first>[_<label>][_<residual>...].<ext>
//! ```
//!
//! Residual segments are the original segments minus anything that identified the
//! student (id tokens, name tokens, homeroom codes) and minus the label itself, so
//! renaming an already renamed file yields the same name.

use super::homeroom::parse_homeroom_code;
use crate::model::{MatchCandidate, StudentRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeroomPlacement {
    #[default]
    Omit,
    Prefix,
    Embedded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingOptions {
    pub placement: HomeroomPlacement,
    /// Free text inserted after the name, e.g. an assignment title.
    pub label: Option<String>,
    /// Keep the unidentified parts of the original name as a suffix.
    pub keep_residual: bool,
}

fn is_identifying(segment: &str, student: &StudentRecord) -> bool {
    let lowered = segment.trim().to_lowercase();
    let id = student.id.to_string();
    if lowered == id || lowered == format!("b{}", id) {
        return true;
    }
    let last = student.last.to_lowercase();
    let first = student.first.to_lowercase();
    if lowered == last || lowered == first || lowered == format!("{}{}", last, first) {
        return true;
    }
    parse_homeroom_code(segment).is_some()
}

/// Segments left over once the identifying ones are removed.
pub fn residual_segments(
    candidate: &MatchCandidate,
    student: &StudentRecord,
    label: Option<&str>,
) -> Vec<String> {
    candidate
        .segments
        .iter()
        .filter(|seg| !is_identifying(seg, student))
        .filter(|seg| label != Some(seg.as_str()))
        .cloned()
        .collect()
}

/// Returns `None` when the candidate has no student.
pub fn synthesize_name(candidate: &MatchCandidate, options: &NamingOptions) -> Option<String> {
    let student = candidate.student.as_ref()?;
    let label = options
        .label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let mut parts: Vec<String> = Vec::new();
    match options.placement {
        HomeroomPlacement::Omit => parts.push(student.id.to_string()),
        HomeroomPlacement::Prefix => {
            parts.push(student.homeroom_code());
            parts.push(student.id.to_string());
        }
        HomeroomPlacement::Embedded => {
            parts.push(student.id.to_string());
            parts.push(student.homeroom_code());
        }
    }
    parts.push(student.full_name());
    if let Some(label) = label {
        parts.push(label.to_string());
    }
    if options.keep_residual {
        parts.extend(residual_segments(candidate, student, label));
    }

    let mut name = parts.join("_");
    if let Some(ext) = &candidate.extension {
        name.push('.');
        name.push_str(ext);
    }
    Some(name)
}
