//! # Rendering
//!
//! Every function here turns library results into a `String`; printing happens in
//! `commands.rs`. Columns are padded by display width so Japanese names line up.

use super::styles;
use chrono::{DateTime, Utc};
use folioapp::commands::{CmdMessage, MessageLevel, RenamePlan, SkippedFile};
use folioapp::model::{PriorState, TaskKind, UndoEntry};
use unicode_width::UnicodeWidthStr;

const ARROW: &str = "→";

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let style = match message.level {
            MessageLevel::Info => &*styles::INFO,
            MessageLevel::Success => &*styles::SUCCESS,
            MessageLevel::Warning => &*styles::WARNING,
            MessageLevel::Error => &*styles::ERROR,
        };
        out.push_str(&style.apply_to(&message.content).to_string());
        out.push('\n');
    }
    out
}

fn pad_to(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Planned renames as `former → new`, followed by the files left alone.
pub fn render_plan(plan: &[RenamePlan], skipped: &[SkippedFile]) -> String {
    let mut out = String::new();
    let width = plan
        .iter()
        .map(|row| row.former_name.width())
        .max()
        .unwrap_or(0);
    for row in plan {
        out.push_str(&format!(
            "{}  {}  {} {}\n",
            styles::FORMER_NAME.apply_to(pad_to(&row.former_name, width)),
            ARROW,
            styles::STUDENT.apply_to(&row.name),
            styles::FAINT.apply_to(format!("({})", row.student_id)),
        ));
    }
    if !skipped.is_empty() {
        if !plan.is_empty() {
            out.push('\n');
        }
        let width = skipped.iter().map(|s| s.name.width()).max().unwrap_or(0);
        for skip in skipped {
            out.push_str(&format!(
                "{}  {}\n",
                pad_to(&skip.name, width),
                styles::SKIPPED.apply_to(&skip.reason),
            ));
        }
    }
    out
}

pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    timeago::Formatter::new().convert(elapsed.to_std().unwrap_or_default())
}

/// One line per task: key, kind, file count and age.
pub fn render_tasks(tasks: &[UndoEntry], now: DateTime<Utc>) -> String {
    let key_width = tasks.iter().map(|t| t.key.width()).max().unwrap_or(0);
    let kind_width = tasks
        .iter()
        .map(|t| t.kind.to_string().width())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format!(
            "{}  {}  {:>4} file(s)  {}\n",
            styles::KEY.apply_to(pad_to(&task.key, key_width)),
            styles::TASK_KIND.apply_to(pad_to(&task.kind.to_string(), kind_width)),
            task.prior_state.len(),
            styles::TIME.apply_to(format_time_ago(task.created_at, now)),
        ));
    }
    out
}

fn describe_prior(kind: TaskKind, prior: &PriorState) -> String {
    match kind {
        TaskKind::Rename => format!(
            "{} {} {}",
            prior.name,
            ARROW,
            prior.applied_name.as_deref().unwrap_or("?")
        ),
        TaskKind::Move => format!(
            "{}: {} {} {}",
            prior.name,
            prior.parent_id.as_deref().unwrap_or("-"),
            ARROW,
            prior.moved_to.as_deref().unwrap_or("-")
        ),
        TaskKind::Trash | TaskKind::Untrash => format!(
            "{} (was {})",
            prior.name,
            if prior.trashed { "trashed" } else { "not trashed" }
        ),
        TaskKind::SetProperties => {
            let props: Vec<String> = prior
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.as_deref().unwrap_or("<unset>")))
                .collect();
            format!("{} [{}]", prior.name, props.join(", "))
        }
    }
}

/// Header plus one line per recorded file.
pub fn render_entry(entry: &UndoEntry, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "{} {} {}\n",
        styles::KEY.apply_to(&entry.key),
        styles::TASK_KIND.apply_to(entry.kind),
        styles::TIME.apply_to(format_time_ago(entry.created_at, now)),
    );
    let width = entry
        .prior_state
        .iter()
        .map(|p| p.file_id.width())
        .max()
        .unwrap_or(0);
    for prior in &entry.prior_state {
        out.push_str(&format!(
            "  {}  {}\n",
            styles::FAINT.apply_to(pad_to(&prior.file_id, width)),
            describe_prior(entry.kind, prior),
        ));
    }
    out
}
