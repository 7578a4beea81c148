//! Terminal styles for the folio CLI.
//!
//! Styles are semantic: code asks for `TIME` or `STUDENT`, never for a colour. Changing the
//! look means editing this file only. `console` drops the escapes on its own when the output
//! is not a terminal or `NO_COLOR` is set.

use console::Style;
use once_cell::sync::Lazy;

/// Timestamps and other metadata.
pub static TIME: Lazy<Style> = Lazy::new(|| Style::new().dim());

/// Ledger keys and file ids.
pub static KEY: Lazy<Style> = Lazy::new(|| Style::new().cyan());

pub static TASK_KIND: Lazy<Style> = Lazy::new(|| Style::new().bold());

/// A resolved student or a synthesized name.
pub static STUDENT: Lazy<Style> = Lazy::new(|| Style::new().green());

pub static FORMER_NAME: Lazy<Style> = Lazy::new(|| Style::new().dim());

pub static SKIPPED: Lazy<Style> = Lazy::new(|| Style::new().yellow());

pub static SUCCESS: Lazy<Style> = Lazy::new(|| Style::new().green());
pub static WARNING: Lazy<Style> = Lazy::new(|| Style::new().yellow());
pub static ERROR: Lazy<Style> = Lazy::new(|| Style::new().red().bold());
pub static INFO: Lazy<Style> = Lazy::new(Style::new);

/// Section separators and hints.
pub static FAINT: Lazy<Style> = Lazy::new(|| Style::new().dim());
